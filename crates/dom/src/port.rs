use async_trait::async_trait;

use crate::errors::DomError;
use crate::model::{DomEvent, LayoutRect, NodeId, Viewport};
use crate::query::ElementQuery;

/// Seam between the automation kernel and the live document.
///
/// The page observer and command executor are written entirely against this
/// trait; the in-memory [`crate::SyntheticDom`] implements it for tests and
/// the demo harness, and a real content-script bridge would implement it
/// against an actual page.
#[async_trait]
pub trait DomPort: Send + Sync {
    async fn url(&self) -> String;
    async fn title(&self) -> String;
    async fn viewport(&self) -> Viewport;
    /// Total scrollable extent of the document, page coordinates.
    async fn content_size(&self) -> (f64, f64);

    /// All elements in document traversal order.
    async fn document_order(&self) -> Vec<NodeId>;
    /// Elements matching the query, in document order.
    async fn query(&self, query: &ElementQuery) -> Vec<NodeId>;
    /// Whether the node is still attached to the document.
    async fn contains(&self, node: NodeId) -> bool;
    /// Strict descendants of a node, in document order.
    async fn descendants(&self, node: NodeId) -> Vec<NodeId>;

    async fn tag(&self, node: NodeId) -> Result<String, DomError>;
    async fn attr(&self, node: NodeId, name: &str) -> Result<Option<String>, DomError>;
    /// Visible text content, descendants included, whitespace collapsed.
    async fn text(&self, node: NodeId) -> Result<String, DomError>;
    async fn value(&self, node: NodeId) -> Result<Option<String>, DomError>;
    async fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError>;
    async fn is_content_editable(&self, node: NodeId) -> Result<bool, DomError>;
    /// Nearest enclosing `<form>`, if any.
    async fn enclosing_form(&self, node: NodeId) -> Result<Option<NodeId>, DomError>;

    /// Computed-style hidden (display/visibility) or fully transparent,
    /// inherited from ancestors.
    async fn is_hidden(&self, node: NodeId) -> Result<bool, DomError>;
    /// Layout geometry; `None` when the node is detached from layout.
    async fn layout_rect(&self, node: NodeId) -> Result<Option<LayoutRect>, DomError>;

    async fn click(&self, node: NodeId) -> Result<(), DomError>;
    async fn dispatch(&self, node: NodeId, event: DomEvent) -> Result<(), DomError>;
    /// Override one inline style property, returning the previous value so
    /// the caller can restore it later.
    async fn set_style(
        &self,
        node: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<String>, DomError>;

    async fn scroll_by(&self, dx: f64, dy: f64);
    async fn scroll_to(&self, x: f64, y: f64);
    async fn scroll_into_view(&self, node: NodeId) -> Result<(), DomError>;
    async fn submit_form(&self, form: NodeId) -> Result<(), DomError>;
    async fn navigate(&self, url: &str);
}
