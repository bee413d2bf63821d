pub mod agent;
pub mod channel;
pub mod messages;

pub use agent::PageAgent;
pub use channel::{page_channel, InProcessChannel, PageChannel, RequestStream};
pub use messages::{PageRequest, PageResponse};
