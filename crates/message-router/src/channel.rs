use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::warn;

use trolley_core_types::AutomationError;

use crate::messages::{PageRequest, PageResponse};

/// Send-and-await seam between the coordinator and a page context.
///
/// Delivery is at-most-once: there is no resend, and a reply that never
/// arrives is bounded by the channel's per-call timeout rather than hanging
/// the caller forever.
#[async_trait]
pub trait PageChannel: Send + Sync {
    async fn request(&self, request: PageRequest) -> Result<PageResponse, AutomationError>;
}

pub(crate) struct Envelope {
    pub request: PageRequest,
    pub reply: oneshot::Sender<PageResponse>,
}

/// Coordinator-side handle of an in-process channel pair.
pub struct InProcessChannel {
    tx: mpsc::Sender<Envelope>,
    call_timeout: Duration,
}

/// Page-side stream of incoming requests, consumed by a [`crate::PageAgent`].
pub struct RequestStream {
    pub(crate) rx: mpsc::Receiver<Envelope>,
}

/// Create a connected channel pair with the given per-call timeout.
pub fn page_channel(capacity: usize, call_timeout: Duration) -> (InProcessChannel, RequestStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (InProcessChannel { tx, call_timeout }, RequestStream { rx })
}

#[async_trait]
impl PageChannel for InProcessChannel {
    async fn request(&self, request: PageRequest) -> Result<PageResponse, AutomationError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| AutomationError::Transport("page context unavailable".into()))?;

        match timeout(self.call_timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(AutomationError::Transport(
                "page context dropped the reply".into(),
            )),
            Err(_) => {
                warn!(timeout_ms = self.call_timeout.as_millis() as u64, "page call timed out");
                Err(AutomationError::Transport(format!(
                    "page call timed out after {}ms",
                    self.call_timeout.as_millis()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unserved_requests_time_out_as_transport_errors() {
        let (channel, _stream) = page_channel(4, Duration::from_millis(20));
        let err = channel.request(PageRequest::ObservePage).await.unwrap_err();
        assert!(matches!(err, AutomationError::Transport(_)));
    }

    #[tokio::test]
    async fn closed_page_context_is_a_transport_error() {
        let (channel, stream) = page_channel(4, Duration::from_millis(100));
        drop(stream);
        let err = channel.request(PageRequest::ObservePage).await.unwrap_err();
        assert!(matches!(err, AutomationError::Transport(_)));
    }
}
