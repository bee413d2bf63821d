use thiserror::Error;

use trolley_core_types::AutomationError;

use crate::model::NodeId;

#[derive(Debug, Error, Clone)]
pub enum DomError {
    #[error("node {0} is gone from the document")]
    NodeGone(NodeId),
    #[error("{0}")]
    Message(String),
}

impl From<DomError> for AutomationError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::NodeGone(node) => {
                AutomationError::ElementNotFound(format!("node {node} is gone"))
            }
            DomError::Message(msg) => AutomationError::Message(msg),
        }
    }
}
