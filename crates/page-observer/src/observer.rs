use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use trolley_dom::{DomPort, ElementQuery, NodeId, Viewport};
use trolley_element_registry::ElementRegistry;

use crate::classify::{descriptor_kind, is_interactive, ALLOWED_ATTRIBUTES};
use crate::model::{ElementDescriptor, ElementLocation, PageSnapshot};

const MAX_TEXT_LEN: usize = 120;

/// Builds fresh snapshots of the page's interactive surface.
///
/// Each call clears the element registry and re-registers everything it
/// finds, so descriptor ids from a prior snapshot stop resolving the moment
/// a new one is taken.
pub struct PageObserver {
    registry: Arc<ElementRegistry>,
}

impl PageObserver {
    pub fn new(registry: Arc<ElementRegistry>) -> Self {
        Self { registry }
    }

    /// Full re-scan of the document. Never fails on an empty page; nodes
    /// torn down mid-scan are simply skipped.
    #[instrument(skip_all)]
    pub async fn observe(&self, dom: &dyn DomPort) -> PageSnapshot {
        let pass = self.registry.begin_pass();
        let viewport = dom.viewport().await;

        let mut elements = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();

        for node in dom.document_order().await {
            if !self.node_is_interactive(dom, node).await {
                continue;
            }
            self.try_append(dom, node, &viewport, &mut seen, &mut elements)
                .await;
        }

        // Form fields the interactive-role heuristic missed (e.g. unlabeled
        // inputs) are appended after the main scan.
        let form_fields = dom
            .query(&ElementQuery::and([
                ElementQuery::or([
                    ElementQuery::tag("input"),
                    ElementQuery::tag("select"),
                    ElementQuery::tag("textarea"),
                ]),
                ElementQuery::descendant_of(ElementQuery::tag("form")),
            ]))
            .await;
        for node in form_fields {
            if seen.contains(&node) {
                continue;
            }
            self.try_append(dom, node, &viewport, &mut seen, &mut elements)
                .await;
        }

        debug!(pass, count = elements.len(), "observation pass complete");
        PageSnapshot {
            url: dom.url().await,
            title: dom.title().await,
            elements,
        }
    }

    async fn node_is_interactive(&self, dom: &dyn DomPort, node: NodeId) -> bool {
        let Ok(tag) = dom.tag(node).await else {
            return false;
        };
        let has_href = matches!(dom.attr(node, "href").await, Ok(Some(_)));
        let role = dom.attr(node, "role").await.ok().flatten();
        let tabindex = dom.attr(node, "tabindex").await.ok().flatten();
        is_interactive(&tag, has_href, role.as_deref(), tabindex.as_deref())
    }

    async fn try_append(
        &self,
        dom: &dyn DomPort,
        node: NodeId,
        viewport: &Viewport,
        seen: &mut HashSet<NodeId>,
        elements: &mut Vec<ElementDescriptor>,
    ) {
        let hidden = match dom.is_hidden(node).await {
            Ok(hidden) => hidden,
            Err(_) => return,
        };
        let rect = match dom.layout_rect(node).await {
            Ok(Some(rect)) if rect.area() > 0.0 => rect,
            _ => return,
        };
        if hidden {
            return;
        }
        if let Some(descriptor) = self.build_descriptor(dom, node, viewport, rect).await {
            seen.insert(node);
            elements.push(descriptor);
        }
    }

    async fn build_descriptor(
        &self,
        dom: &dyn DomPort,
        node: NodeId,
        viewport: &Viewport,
        rect: trolley_dom::LayoutRect,
    ) -> Option<ElementDescriptor> {
        let tag = dom.tag(node).await.ok()?;
        let role = dom.attr(node, "role").await.ok().flatten();
        let input_type = dom.attr(node, "type").await.ok().flatten();
        let kind = descriptor_kind(&tag, role.as_deref(), input_type.as_deref());

        let mut text = dom.text(node).await.unwrap_or_default();
        if text.is_empty() && matches!(tag.as_str(), "input" | "textarea" | "select") {
            text = dom
                .attr(node, "placeholder")
                .await
                .ok()
                .flatten()
                .or(dom.value(node).await.ok().flatten())
                .unwrap_or_default();
        }
        if text.len() > MAX_TEXT_LEN {
            let mut cut = MAX_TEXT_LEN;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }

        let mut attributes = BTreeMap::new();
        for name in ALLOWED_ATTRIBUTES {
            if let Ok(Some(value)) = dom.attr(node, name).await {
                attributes.insert((*name).to_string(), value);
            }
        }
        if let Ok(Some(value)) = dom.value(node).await {
            attributes.insert("value".to_string(), value);
        }

        let token = self.registry.register(node);
        Some(ElementDescriptor {
            id: token.to_string(),
            kind,
            text,
            attributes,
            location: ElementLocation {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                viewport_x: rect.x - viewport.scroll_x,
                viewport_y: rect.y - viewport.scroll_y,
                is_in_viewport: viewport.intersects(&rect),
            },
            is_visible: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trolley_core_types::ElementToken;
    use trolley_dom::{LayoutRect, SyntheticDom};

    fn grocery_page() -> SyntheticDom {
        let dom = SyntheticDom::new("https://shop.example/", "Groceries");
        let form = dom.add(None, "form");
        let search = dom.add(Some(form), "input");
        dom.set_attr(search, "type", "search");
        dom.set_attr(search, "placeholder", "Search groceries");
        dom.set_rect(search, LayoutRect::new(20.0, 10.0, 400.0, 36.0));
        let submit = dom.add(Some(form), "button");
        dom.set_attr(submit, "type", "submit");
        dom.set_text(submit, "Search");
        dom.set_rect(submit, LayoutRect::new(430.0, 10.0, 80.0, 36.0));
        let link = dom.add(None, "a");
        dom.set_attr(link, "href", "/cart");
        dom.set_text(link, "View cart");
        dom.set_rect(link, LayoutRect::new(1100.0, 10.0, 100.0, 24.0));
        dom
    }

    #[tokio::test]
    async fn snapshot_lists_interactive_elements_in_document_order() {
        let dom = grocery_page();
        let registry = Arc::new(ElementRegistry::new());
        let observer = PageObserver::new(Arc::clone(&registry));

        let snapshot = observer.observe(&dom).await;
        assert_eq!(snapshot.url, "https://shop.example/");
        assert_eq!(snapshot.title, "Groceries");
        let kinds: Vec<&str> = snapshot.elements.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["input-search", "button", "link"]);
        assert_eq!(snapshot.elements[0].text, "Search groceries");
    }

    #[tokio::test]
    async fn ids_resolve_until_the_next_pass() {
        let dom = grocery_page();
        let registry = Arc::new(ElementRegistry::new());
        let observer = PageObserver::new(Arc::clone(&registry));

        let snapshot = observer.observe(&dom).await;
        let token: ElementToken = snapshot.elements[0].id.parse().unwrap();
        assert!(registry.resolve(&token).is_ok());

        observer.observe(&dom).await;
        assert!(registry.resolve(&token).is_err());
    }

    #[tokio::test]
    async fn repeated_observation_is_idempotent_modulo_ids() {
        let dom = grocery_page();
        let registry = Arc::new(ElementRegistry::new());
        let observer = PageObserver::new(registry);

        let mut first = observer.observe(&dom).await;
        let mut second = observer.observe(&dom).await;
        for element in first.elements.iter_mut().chain(second.elements.iter_mut()) {
            element.id.clear();
        }
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn hidden_and_detached_elements_are_skipped() {
        let dom = grocery_page();
        let hidden_btn = dom.add(None, "button");
        dom.set_text(hidden_btn, "Hidden");
        dom.set_rect(hidden_btn, LayoutRect::new(0.0, 500.0, 50.0, 20.0));
        dom.set_inline_style(hidden_btn, "display", "none");
        let ghost = dom.add(None, "button");
        dom.detach_layout(ghost);

        let observer = PageObserver::new(Arc::new(ElementRegistry::new()));
        let snapshot = observer.observe(&dom).await;
        assert!(snapshot.elements.iter().all(|e| e.text != "Hidden"));
        assert_eq!(snapshot.elements.len(), 3);
    }

    #[tokio::test]
    async fn unlabeled_form_fields_are_appended() {
        let dom = grocery_page();
        let form = dom.add(None, "form");
        let qty = dom.add(Some(form), "input");
        dom.set_attr(qty, "name", "quantity");
        dom.set_attr(qty, "type", "number");
        dom.set_rect(qty, LayoutRect::new(10.0, 300.0, 60.0, 30.0));

        let observer = PageObserver::new(Arc::new(ElementRegistry::new()));
        let snapshot = observer.observe(&dom).await;
        let last = snapshot.elements.last().unwrap();
        assert_eq!(last.kind, "input-number");
        assert_eq!(last.attributes.get("name").map(String::as_str), Some("quantity"));
    }

    #[tokio::test]
    async fn empty_page_yields_empty_snapshot() {
        let dom = SyntheticDom::new("about:blank", "");
        let observer = PageObserver::new(Arc::new(ElementRegistry::new()));
        let snapshot = observer.observe(&dom).await;
        assert!(snapshot.elements.is_empty());
    }

    #[tokio::test]
    async fn attribute_allow_list_is_enforced() {
        let dom = SyntheticDom::new("https://shop.example/", "Shop");
        let button = dom.add(None, "button");
        dom.set_text(button, "Add");
        dom.set_rect(button, LayoutRect::new(0.0, 0.0, 40.0, 20.0));
        dom.set_attr(button, "aria-label", "Add to cart");
        dom.set_attr(button, "data-internal-state", "secret");

        let observer = PageObserver::new(Arc::new(ElementRegistry::new()));
        let snapshot = observer.observe(&dom).await;
        let attrs = &snapshot.elements[0].attributes;
        assert_eq!(attrs.get("aria-label").map(String::as_str), Some("Add to cart"));
        assert!(!attrs.contains_key("data-internal-state"));
    }

    #[tokio::test]
    async fn descriptor_serializes_with_wire_field_names() {
        let dom = grocery_page();
        let observer = PageObserver::new(Arc::new(ElementRegistry::new()));
        let snapshot = observer.observe(&dom).await;
        let json = serde_json::to_value(&snapshot.elements[0]).unwrap();
        assert!(json.get("type").is_some());
        assert!(json.get("isVisible").is_some());
        assert!(json["location"].get("isInViewport").is_some());
    }
}
