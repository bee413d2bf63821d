//! In-memory document implementing [`DomPort`].
//!
//! Plays the role a real content-script bridge would play against a live
//! page: tests and the demo binary build a page out of nodes with explicit
//! geometry and styles, then drive the observer and executor against it.
//! Every dispatched event, click, form submission and navigation is recorded
//! so tests can assert on the exact interaction sequence.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::DomError;
use crate::model::{DomEvent, LayoutRect, NodeId, Viewport};
use crate::port::DomPort;
use crate::query::ElementQuery;

/// One recorded event dispatch, in dispatch order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub node: NodeId,
    pub event: DomEvent,
}

#[derive(Clone, Debug)]
struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    own_text: String,
    value: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Option<LayoutRect>,
    styles: BTreeMap<String, String>,
    content_editable: bool,
}

impl NodeData {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            own_text: String::new(),
            value: String::new(),
            parent,
            children: Vec::new(),
            rect: Some(LayoutRect::default()),
            styles: BTreeMap::new(),
            content_editable: false,
        }
    }
}

#[derive(Debug)]
struct DomState {
    url: String,
    title: String,
    nodes: HashMap<NodeId, NodeData>,
    order: Vec<NodeId>,
    next_id: NodeId,
    viewport: Viewport,
    content_size: (f64, f64),
    events: Vec<EventRecord>,
    clicks: Vec<NodeId>,
    submissions: Vec<NodeId>,
    navigations: Vec<String>,
}

pub struct SyntheticDom {
    state: RwLock<DomState>,
}

impl SyntheticDom {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            state: RwLock::new(DomState {
                url: url.to_string(),
                title: title.to_string(),
                nodes: HashMap::new(),
                order: Vec::new(),
                next_id: 1,
                viewport: Viewport::default(),
                content_size: (1280.0, 2000.0),
                events: Vec::new(),
                clicks: Vec::new(),
                submissions: Vec::new(),
                navigations: Vec::new(),
            }),
        }
    }

    pub fn set_viewport_size(&self, width: f64, height: f64) {
        let mut state = self.state.write();
        state.viewport.width = width;
        state.viewport.height = height;
    }

    pub fn set_content_size(&self, width: f64, height: f64) {
        self.state.write().content_size = (width, height);
    }

    /// Append an element under `parent` (or at the top level) and return its
    /// node id. Document order is insertion order.
    pub fn add(&self, parent: Option<NodeId>, tag: &str) -> NodeId {
        let mut state = self.state.write();
        let id = state.next_id;
        state.next_id += 1;
        state.nodes.insert(id, NodeData::new(tag, parent));
        state.order.push(id);
        if let Some(parent) = parent {
            if let Some(node) = state.nodes.get_mut(&parent) {
                node.children.push(id);
            }
        }
        id
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.state.write().nodes.get_mut(&node) {
            data.attrs
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        if let Some(data) = self.state.write().nodes.get_mut(&node) {
            data.own_text = text.to_string();
        }
    }

    pub fn set_rect(&self, node: NodeId, rect: LayoutRect) {
        if let Some(data) = self.state.write().nodes.get_mut(&node) {
            data.rect = Some(rect);
        }
    }

    /// Mark the node as having no layout box (e.g. `<input type="hidden">`).
    pub fn detach_layout(&self, node: NodeId) {
        if let Some(data) = self.state.write().nodes.get_mut(&node) {
            data.rect = None;
        }
    }

    pub fn set_inline_style(&self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.state.write().nodes.get_mut(&node) {
            data.styles
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn mark_content_editable(&self, node: NodeId) {
        if let Some(data) = self.state.write().nodes.get_mut(&node) {
            data.content_editable = true;
        }
    }

    /// Remove a node (and its subtree) from the document.
    pub fn remove(&self, node: NodeId) {
        let mut state = self.state.write();
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if let Some(data) = state.nodes.remove(&id) {
                pending.extend(data.children);
                if let Some(parent) = data.parent {
                    if let Some(parent_data) = state.nodes.get_mut(&parent) {
                        parent_data.children.retain(|child| *child != id);
                    }
                }
            }
            state.order.retain(|n| *n != id);
        }
    }

    pub fn event_log(&self) -> Vec<EventRecord> {
        self.state.read().events.clone()
    }

    pub fn clicks(&self) -> Vec<NodeId> {
        self.state.read().clicks.clone()
    }

    pub fn submissions(&self) -> Vec<NodeId> {
        self.state.read().submissions.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.read().navigations.clone()
    }

    pub fn inline_style(&self, node: NodeId, name: &str) -> Option<String> {
        self.state
            .read()
            .nodes
            .get(&node)
            .and_then(|data| data.styles.get(name).cloned())
    }

    pub fn current_value(&self, node: NodeId) -> Option<String> {
        self.state
            .read()
            .nodes
            .get(&node)
            .map(|data| data.value.clone())
    }

    pub fn scroll_offset(&self) -> (f64, f64) {
        let state = self.state.read();
        (state.viewport.scroll_x, state.viewport.scroll_y)
    }

    fn collect_text(state: &DomState, node: NodeId, out: &mut String) {
        if let Some(data) = state.nodes.get(&node) {
            if !data.own_text.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(data.own_text.trim());
            }
            for child in &data.children {
                Self::collect_text(state, *child, out);
            }
        }
    }

    fn node_text(state: &DomState, node: NodeId) -> String {
        let mut out = String::new();
        Self::collect_text(state, node, &mut out);
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn hidden_by_style(state: &DomState, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(data) = state.nodes.get(&id) else {
                return true;
            };
            if data.styles.get("display").map(String::as_str) == Some("none")
                || data.styles.get("visibility").map(String::as_str) == Some("hidden")
            {
                return true;
            }
            if id == node {
                if let Some(opacity) = data.styles.get("opacity") {
                    if opacity.parse::<f64>().map(|o| o == 0.0).unwrap_or(false) {
                        return true;
                    }
                }
            }
            current = data.parent;
        }
        false
    }

    fn matches(state: &DomState, node: NodeId, query: &ElementQuery) -> bool {
        let Some(data) = state.nodes.get(&node) else {
            return false;
        };
        match query {
            ElementQuery::Tag(tag) => data.tag.eq_ignore_ascii_case(tag),
            ElementQuery::Id(id) => data.attrs.get("id").map(String::as_str) == Some(id.as_str()),
            ElementQuery::AttrEquals { name, value } => {
                data.attrs.get(&name.to_ascii_lowercase()).map(String::as_str)
                    == Some(value.as_str())
            }
            ElementQuery::AttrContains { name, value } => data
                .attrs
                .get(&name.to_ascii_lowercase())
                .map(|v| v.to_ascii_lowercase().contains(&value.to_ascii_lowercase()))
                .unwrap_or(false),
            ElementQuery::HasAttr(name) => data.attrs.contains_key(&name.to_ascii_lowercase()),
            ElementQuery::TextContains(value) => Self::node_text(state, node)
                .to_ascii_lowercase()
                .contains(&value.to_ascii_lowercase()),
            ElementQuery::DescendantOf(ancestor) => {
                let mut current = data.parent;
                while let Some(id) = current {
                    if Self::matches(state, id, ancestor) {
                        return true;
                    }
                    current = state.nodes.get(&id).and_then(|d| d.parent);
                }
                false
            }
            ElementQuery::And(parts) => parts.iter().all(|part| Self::matches(state, node, part)),
            ElementQuery::Or(parts) => parts.iter().any(|part| Self::matches(state, node, part)),
            ElementQuery::Not(inner) => !Self::matches(state, node, inner),
        }
    }

    fn ensure<'a>(state: &'a DomState, node: NodeId) -> Result<&'a NodeData, DomError> {
        state.nodes.get(&node).ok_or(DomError::NodeGone(node))
    }
}

#[async_trait]
impl DomPort for SyntheticDom {
    async fn url(&self) -> String {
        self.state.read().url.clone()
    }

    async fn title(&self) -> String {
        self.state.read().title.clone()
    }

    async fn viewport(&self) -> Viewport {
        self.state.read().viewport
    }

    async fn content_size(&self) -> (f64, f64) {
        self.state.read().content_size
    }

    async fn document_order(&self) -> Vec<NodeId> {
        self.state.read().order.clone()
    }

    async fn query(&self, query: &ElementQuery) -> Vec<NodeId> {
        let state = self.state.read();
        state
            .order
            .iter()
            .copied()
            .filter(|node| Self::matches(&state, *node, query))
            .collect()
    }

    async fn contains(&self, node: NodeId) -> bool {
        self.state.read().nodes.contains_key(&node)
    }

    async fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let state = self.state.read();
        let mut out = Vec::new();
        for candidate in &state.order {
            if *candidate == node {
                continue;
            }
            let mut current = state.nodes.get(candidate).and_then(|d| d.parent);
            while let Some(id) = current {
                if id == node {
                    out.push(*candidate);
                    break;
                }
                current = state.nodes.get(&id).and_then(|d| d.parent);
            }
        }
        out
    }

    async fn tag(&self, node: NodeId) -> Result<String, DomError> {
        let state = self.state.read();
        Ok(Self::ensure(&state, node)?.tag.clone())
    }

    async fn attr(&self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let state = self.state.read();
        Ok(Self::ensure(&state, node)?
            .attrs
            .get(&name.to_ascii_lowercase())
            .cloned())
    }

    async fn text(&self, node: NodeId) -> Result<String, DomError> {
        let state = self.state.read();
        Self::ensure(&state, node)?;
        Ok(Self::node_text(&state, node))
    }

    async fn value(&self, node: NodeId) -> Result<Option<String>, DomError> {
        let state = self.state.read();
        let data = Self::ensure(&state, node)?;
        if data.value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(data.value.clone()))
        }
    }

    async fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError> {
        let mut state = self.state.write();
        let data = state.nodes.get_mut(&node).ok_or(DomError::NodeGone(node))?;
        data.value = value.to_string();
        Ok(())
    }

    async fn is_content_editable(&self, node: NodeId) -> Result<bool, DomError> {
        let state = self.state.read();
        let data = Self::ensure(&state, node)?;
        Ok(data.content_editable
            || data.attrs.get("contenteditable").map(String::as_str) == Some("true"))
    }

    async fn enclosing_form(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        let state = self.state.read();
        let mut current = Self::ensure(&state, node)?.parent;
        while let Some(id) = current {
            let Some(data) = state.nodes.get(&id) else {
                break;
            };
            if data.tag == "form" {
                return Ok(Some(id));
            }
            current = data.parent;
        }
        Ok(None)
    }

    async fn is_hidden(&self, node: NodeId) -> Result<bool, DomError> {
        let state = self.state.read();
        Self::ensure(&state, node)?;
        Ok(Self::hidden_by_style(&state, node))
    }

    async fn layout_rect(&self, node: NodeId) -> Result<Option<LayoutRect>, DomError> {
        let state = self.state.read();
        Ok(Self::ensure(&state, node)?.rect)
    }

    async fn click(&self, node: NodeId) -> Result<(), DomError> {
        let mut state = self.state.write();
        if !state.nodes.contains_key(&node) {
            return Err(DomError::NodeGone(node));
        }
        state.clicks.push(node);
        Ok(())
    }

    async fn dispatch(&self, node: NodeId, event: DomEvent) -> Result<(), DomError> {
        let mut state = self.state.write();
        if !state.nodes.contains_key(&node) {
            return Err(DomError::NodeGone(node));
        }
        state.events.push(EventRecord { node, event });
        Ok(())
    }

    async fn set_style(
        &self,
        node: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<String>, DomError> {
        let mut state = self.state.write();
        let data = state.nodes.get_mut(&node).ok_or(DomError::NodeGone(node))?;
        let name = name.to_ascii_lowercase();
        let previous = match value {
            Some(value) => data.styles.insert(name, value.to_string()),
            None => data.styles.remove(&name),
        };
        Ok(previous)
    }

    async fn scroll_by(&self, dx: f64, dy: f64) {
        let mut state = self.state.write();
        let (max_x, max_y) = (
            (state.content_size.0 - state.viewport.width).max(0.0),
            (state.content_size.1 - state.viewport.height).max(0.0),
        );
        state.viewport.scroll_x = (state.viewport.scroll_x + dx).clamp(0.0, max_x);
        state.viewport.scroll_y = (state.viewport.scroll_y + dy).clamp(0.0, max_y);
    }

    async fn scroll_to(&self, x: f64, y: f64) {
        let mut state = self.state.write();
        let (max_x, max_y) = (
            (state.content_size.0 - state.viewport.width).max(0.0),
            (state.content_size.1 - state.viewport.height).max(0.0),
        );
        state.viewport.scroll_x = x.clamp(0.0, max_x);
        state.viewport.scroll_y = y.clamp(0.0, max_y);
    }

    async fn scroll_into_view(&self, node: NodeId) -> Result<(), DomError> {
        let rect = {
            let state = self.state.read();
            Self::ensure(&state, node)?.rect
        };
        if let Some(rect) = rect {
            let target_y = {
                let state = self.state.read();
                (rect.y - state.viewport.height / 2.0).max(0.0)
            };
            self.scroll_to(0.0, target_y).await;
        }
        Ok(())
    }

    async fn submit_form(&self, form: NodeId) -> Result<(), DomError> {
        let mut state = self.state.write();
        if !state.nodes.contains_key(&form) {
            return Err(DomError::NodeGone(form));
        }
        state.submissions.push(form);
        state.events.push(EventRecord {
            node: form,
            event: DomEvent::Submit,
        });
        Ok(())
    }

    async fn navigate(&self, url: &str) {
        let mut state = self.state.write();
        state.url = url.to_string();
        state.navigations.push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> (SyntheticDom, NodeId, NodeId) {
        let dom = SyntheticDom::new("https://shop.example/", "Shop");
        let form = dom.add(None, "form");
        let input = dom.add(Some(form), "input");
        dom.set_attr(input, "type", "search");
        dom.set_attr(input, "placeholder", "Search groceries");
        dom.set_rect(input, LayoutRect::new(10.0, 10.0, 300.0, 32.0));
        (dom, form, input)
    }

    #[tokio::test]
    async fn query_matches_typed_predicates() {
        let (dom, _, input) = sample_page();
        let hits = dom
            .query(&ElementQuery::and([
                ElementQuery::tag("input"),
                ElementQuery::attr_contains("placeholder", "SEARCH"),
            ]))
            .await;
        assert_eq!(hits, vec![input]);
        assert!(dom.query(&ElementQuery::tag("button")).await.is_empty());
    }

    #[tokio::test]
    async fn descendant_query_walks_ancestors() {
        let (dom, form, input) = sample_page();
        let hits = dom
            .query(&ElementQuery::and([
                ElementQuery::tag("input"),
                ElementQuery::descendant_of(ElementQuery::tag("form")),
            ]))
            .await;
        assert_eq!(hits, vec![input]);
        assert_eq!(dom.enclosing_form(input).await.unwrap(), Some(form));
    }

    #[tokio::test]
    async fn hidden_inherits_from_ancestors() {
        let dom = SyntheticDom::new("https://shop.example/", "Shop");
        let wrapper = dom.add(None, "div");
        let button = dom.add(Some(wrapper), "button");
        assert!(!dom.is_hidden(button).await.unwrap());
        dom.set_inline_style(wrapper, "display", "none");
        assert!(dom.is_hidden(button).await.unwrap());
    }

    #[tokio::test]
    async fn style_override_returns_previous_value() {
        let (dom, _, input) = sample_page();
        dom.set_inline_style(input, "outline", "1px solid red");
        let prev = dom
            .set_style(input, "outline", Some("3px solid blue"))
            .await
            .unwrap();
        assert_eq!(prev.as_deref(), Some("1px solid red"));
        dom.set_style(input, "outline", prev.as_deref()).await.unwrap();
        assert_eq!(dom.inline_style(input, "outline").as_deref(), Some("1px solid red"));
    }

    #[tokio::test]
    async fn removed_nodes_fail_lookups() {
        let (dom, _, input) = sample_page();
        dom.remove(input);
        assert!(!dom.contains(input).await);
        assert!(matches!(
            dom.tag(input).await,
            Err(DomError::NodeGone(node)) if node == input
        ));
    }

    #[tokio::test]
    async fn scroll_is_clamped_to_content() {
        let dom = SyntheticDom::new("https://shop.example/", "Shop");
        dom.set_content_size(1280.0, 3000.0);
        dom.scroll_by(0.0, 10_000.0).await;
        assert_eq!(dom.scroll_offset(), (0.0, 3000.0 - 720.0));
        dom.scroll_to(0.0, 0.0).await;
        assert_eq!(dom.scroll_offset(), (0.0, 0.0));
    }
}
