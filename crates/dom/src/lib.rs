pub mod errors;
pub mod model;
pub mod port;
pub mod query;
pub mod synthetic;

pub use errors::DomError;
pub use model::{DomEvent, LayoutRect, NodeId, Viewport};
pub use port::DomPort;
pub use query::ElementQuery;
pub use synthetic::SyntheticDom;
