use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use trolley_command_executor::{CommandExecutor, ExecutorTiming};
use trolley_dom::DomPort;
use trolley_element_registry::ElementRegistry;
use trolley_page_observer::PageObserver;

use crate::channel::RequestStream;
use crate::messages::{PageRequest, PageResponse};

/// Page-side request handler. Owns the observer and executor for one page
/// context and serves requests arriving on a [`RequestStream`].
pub struct PageAgent {
    dom: Arc<dyn DomPort>,
    observer: PageObserver,
    executor: CommandExecutor,
}

impl PageAgent {
    pub fn new(dom: Arc<dyn DomPort>, registry: Arc<ElementRegistry>) -> Self {
        Self::with_timing(dom, registry, ExecutorTiming::default())
    }

    pub fn with_timing(
        dom: Arc<dyn DomPort>,
        registry: Arc<ElementRegistry>,
        timing: ExecutorTiming,
    ) -> Self {
        Self {
            dom,
            observer: PageObserver::new(registry.clone()),
            executor: CommandExecutor::with_timing(registry, timing),
        }
    }

    /// Serve requests until the coordinator side hangs up.
    pub fn spawn(self, mut stream: RequestStream) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = stream.rx.recv().await {
                let response = self.handle(envelope.request).await;
                // A dropped reply sender means the caller timed out; nothing
                // left to do with this response.
                let _ = envelope.reply.send(response);
            }
            info!("request stream closed, stopping page agent");
            self.executor.shutdown();
        })
    }

    async fn handle(&self, request: PageRequest) -> PageResponse {
        match request {
            PageRequest::ObservePage => {
                let snapshot = self.observer.observe(self.dom.as_ref()).await;
                debug!(elements = snapshot.elements.len(), "page observed");
                PageResponse::observed(snapshot)
            }
            PageRequest::ExecuteCommand {
                command,
                parameters,
            } => match self.executor.execute(&self.dom, &command, &parameters).await {
                Ok(outcome) => PageResponse::executed(outcome),
                Err(err) => PageResponse::failed(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::page_channel;
    use crate::PageChannel;
    use serde_json::json;
    use std::time::Duration;
    use trolley_dom::{LayoutRect, SyntheticDom};

    fn grocery_page() -> SyntheticDom {
        let dom = SyntheticDom::new("https://shop.example/", "Groceries");
        let button = dom.add(None, "button");
        dom.set_attr(button, "id", "checkout");
        dom.set_text(button, "Checkout");
        dom.set_rect(button, LayoutRect::new(10.0, 10.0, 120.0, 32.0));
        dom
    }

    #[tokio::test]
    async fn observe_then_execute_round_trip() {
        let dom: Arc<dyn DomPort> = Arc::new(grocery_page());
        let registry = Arc::new(ElementRegistry::new());
        let agent = PageAgent::with_timing(dom, registry, ExecutorTiming::instant());

        let (channel, stream) = page_channel(4, Duration::from_secs(1));
        let handle = agent.spawn(stream);

        let observed = channel.request(PageRequest::ObservePage).await.unwrap();
        assert!(observed.success);
        let page = observed.page_data.unwrap();
        assert_eq!(page.elements.len(), 1);

        let token = page.elements[0].id.clone();
        let executed = channel
            .request(PageRequest::ExecuteCommand {
                command: "click".into(),
                parameters: json!({ "selector": token }),
            })
            .await
            .unwrap();
        assert!(executed.success);
        assert!(executed.result.unwrap().is_success());

        drop(channel);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn executor_failures_become_failure_envelopes() {
        let dom: Arc<dyn DomPort> = Arc::new(grocery_page());
        let registry = Arc::new(ElementRegistry::new());
        let agent = PageAgent::with_timing(dom, registry, ExecutorTiming::instant());

        let (channel, stream) = page_channel(4, Duration::from_secs(1));
        let handle = agent.spawn(stream);

        let response = channel
            .request(PageRequest::ExecuteCommand {
                command: "click".into(),
                parameters: json!({ "selector": "agent-id-9-9" }),
            })
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.error.is_some());

        drop(channel);
        handle.await.unwrap();
    }
}
