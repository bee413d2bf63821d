pub mod classify;
pub mod model;
pub mod observer;

pub use model::{ElementDescriptor, ElementLocation, PageSnapshot};
pub use observer::PageObserver;
