use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use trolley_core_types::{AutomationError, ElementToken};
use trolley_dom::{DomEvent, DomPort, ElementQuery, NodeId};
use trolley_element_registry::{ElementRegistry, RegistryError};

use crate::legacy;
use crate::model::{
    require_str_param, sleep_ms, str_param, CommandKind, ExecOutcome, ExecutorTiming,
    ScrollAmount, ScrollDirection,
};

const HIGHLIGHT_OUTLINE: &str = "3px solid #4f8ef7";

/// Input subtypes the `type` command accepts as text targets.
const TEXT_INPUT_TYPES: &[&str] = &["text", "search", "email", "password", "tel", "url", "number"];

/// Executes abstract commands against live elements resolved through the
/// element registry, plus the legacy best-effort heuristics.
pub struct CommandExecutor {
    registry: Arc<ElementRegistry>,
    timing: ExecutorTiming,
    shutdown: CancellationToken,
}

impl CommandExecutor {
    pub fn new(registry: Arc<ElementRegistry>) -> Self {
        Self::with_timing(registry, ExecutorTiming::default())
    }

    pub fn with_timing(registry: Arc<ElementRegistry>, timing: ExecutorTiming) -> Self {
        Self {
            registry,
            timing,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel any deferred style restorations still pending. Called when the
    /// page context is torn down.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    #[instrument(skip(self, dom, parameters))]
    pub async fn execute(
        &self,
        dom: &Arc<dyn DomPort>,
        command: &str,
        parameters: &Value,
    ) -> Result<ExecOutcome, AutomationError> {
        let kind = CommandKind::from_str(command)?;
        match kind {
            CommandKind::Click => {
                let selector = require_str_param(parameters, &["selector"])?;
                self.click(dom, &selector).await
            }
            CommandKind::Type => {
                let selector = require_str_param(parameters, &["selector"])?;
                let text = parameters
                    .get("text")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        AutomationError::InvalidParameter("missing parameter 'text'".into())
                    })?;
                self.type_text(dom.as_ref(), &selector, text).await
            }
            CommandKind::Scroll => {
                let direction = require_str_param(parameters, &["direction"])?;
                let amount =
                    str_param(parameters, &["amount"]).unwrap_or_else(|| "medium".to_string());
                self.scroll(dom.as_ref(), &direction, &amount).await
            }
            CommandKind::Stop => Ok(ExecOutcome::success("stop requested")),
            CommandKind::SearchProduct => {
                legacy::search_product(dom.as_ref(), parameters, &self.timing).await
            }
            CommandKind::AddToCart => legacy::add_to_cart(dom.as_ref(), parameters).await,
            CommandKind::ViewCart => legacy::view_cart(dom.as_ref()).await,
            CommandKind::NavigateTo => legacy::navigate_to(dom.as_ref(), parameters).await,
            CommandKind::FilterProducts => {
                legacy::filter_products(dom.as_ref(), parameters).await
            }
            CommandKind::SelectProduct => legacy::select_product(dom.as_ref(), parameters).await,
        }
    }

    /// Resolve a selector string: registry tokens go through the element
    /// registry, anything else is a literal lookup by id, name, then tag.
    async fn resolve_selector(
        &self,
        dom: &dyn DomPort,
        selector: &str,
    ) -> Result<NodeId, AutomationError> {
        if ElementToken::is_token(selector) {
            let token: ElementToken = selector
                .parse()
                .map_err(|_| RegistryError::Malformed(selector.to_string()))?;
            return self.registry.resolve(&token).map_err(Into::into);
        }

        let candidates: Vec<ElementQuery> = match selector.strip_prefix('#') {
            Some(id) => vec![ElementQuery::id(id)],
            None => vec![
                ElementQuery::id(selector),
                ElementQuery::attr_equals("name", selector),
                ElementQuery::tag(selector),
            ],
        };
        for query in &candidates {
            if let Some(node) = dom.query(query).await.into_iter().next() {
                return Ok(node);
            }
        }
        Err(AutomationError::ElementNotFound(format!(
            "no element matches '{selector}'"
        )))
    }

    async fn click(
        &self,
        dom: &Arc<dyn DomPort>,
        selector: &str,
    ) -> Result<ExecOutcome, AutomationError> {
        let node = self.resolve_selector(dom.as_ref(), selector).await?;

        let viewport = dom.viewport().await;
        if let Some(rect) = dom.layout_rect(node).await? {
            if !viewport.intersects(&rect) {
                dom.scroll_into_view(node).await?;
                sleep_ms(self.timing.scroll_settle_ms).await;
            }
        }

        let previous = dom
            .set_style(node, "outline", Some(HIGHLIGHT_OUTLINE))
            .await?;
        sleep_ms(self.timing.highlight_ms).await;
        dom.click(node).await?;

        // Restoration is fire-and-forget: the click result does not wait for
        // the highlight to fade.
        let dom = Arc::clone(dom);
        let cancel = self.shutdown.child_token();
        let delay = self.timing.highlight_ms;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep_ms(delay) => {
                    if dom.contains(node).await {
                        let _ = dom.set_style(node, "outline", previous.as_deref()).await;
                    }
                }
            }
        });

        Ok(ExecOutcome::success(format!("clicked {selector}")))
    }

    async fn type_text(
        &self,
        dom: &dyn DomPort,
        selector: &str,
        text: &str,
    ) -> Result<ExecOutcome, AutomationError> {
        let node = self.resolve_selector(dom, selector).await?;

        let tag = dom.tag(node).await?;
        let editable = dom.is_content_editable(node).await?;
        let is_text_target = match tag.as_str() {
            "textarea" => true,
            "input" => {
                let subtype = dom
                    .attr(node, "type")
                    .await?
                    .unwrap_or_else(|| "text".to_string())
                    .to_ascii_lowercase();
                TEXT_INPUT_TYPES.contains(&subtype.as_str())
            }
            _ => editable,
        };
        if !is_text_target {
            return Err(AutomationError::InvalidTarget(format!(
                "'{selector}' is a <{tag}>, not a text input"
            )));
        }

        dom.set_value(node, "").await?;
        let mut buffer = String::new();
        for ch in text.chars() {
            let key = ch.to_string();
            dom.dispatch(node, DomEvent::KeyDown { key: key.clone() })
                .await?;
            dom.dispatch(node, DomEvent::KeyPress { key: key.clone() })
                .await?;
            buffer.push(ch);
            dom.set_value(node, &buffer).await?;
            dom.dispatch(node, DomEvent::Input).await?;
            dom.dispatch(node, DomEvent::KeyUp { key }).await?;
            sleep_ms(self.timing.keystroke_ms).await;
        }
        dom.dispatch(node, DomEvent::Change).await?;

        debug!(selector, chars = text.chars().count(), "typed text");
        Ok(ExecOutcome::success(format!(
            "typed {} characters into {selector}",
            text.chars().count()
        )))
    }

    async fn scroll(
        &self,
        dom: &dyn DomPort,
        direction: &str,
        amount: &str,
    ) -> Result<ExecOutcome, AutomationError> {
        // Validate both parameters before touching the page.
        let direction = ScrollDirection::from_str(direction)?;
        let amount = ScrollAmount::from_str(amount)?;

        let viewport = dom.viewport().await;
        let delta = amount.pixels(viewport.height);
        match direction {
            ScrollDirection::Up => dom.scroll_by(0.0, -delta).await,
            ScrollDirection::Down => dom.scroll_by(0.0, delta).await,
            ScrollDirection::Left => dom.scroll_by(-delta, 0.0).await,
            ScrollDirection::Right => dom.scroll_by(delta, 0.0).await,
            ScrollDirection::Top => dom.scroll_to(viewport.scroll_x, 0.0).await,
            ScrollDirection::Bottom => {
                let (_, height) = dom.content_size().await;
                dom.scroll_to(viewport.scroll_x, height).await;
            }
        }
        sleep_ms(self.timing.scroll_command_settle_ms).await;

        Ok(ExecOutcome::success(format!("scrolled {direction:?}").to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trolley_dom::{LayoutRect, SyntheticDom};

    fn setup() -> (Arc<SyntheticDom>, Arc<dyn DomPort>, Arc<ElementRegistry>, CommandExecutor) {
        let dom = Arc::new(SyntheticDom::new("https://shop.example/", "Shop"));
        let port: Arc<dyn DomPort> = dom.clone();
        let registry = Arc::new(ElementRegistry::new());
        let executor =
            CommandExecutor::with_timing(Arc::clone(&registry), ExecutorTiming::instant());
        (dom, port, registry, executor)
    }

    #[tokio::test]
    async fn typing_replays_per_character_events() {
        let (dom, port, _, executor) = setup();
        let input = dom.add(None, "input");
        dom.set_attr(input, "type", "text");
        dom.set_attr(input, "id", "note");
        dom.set_rect(input, LayoutRect::new(0.0, 0.0, 100.0, 20.0));

        let outcome = executor
            .execute(&port, "type", &json!({"selector": "#note", "text": "milk"}))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(dom.current_value(input).as_deref(), Some("milk"));

        let events = dom.event_log();
        let count = |name: &str| events.iter().filter(|e| e.event.name() == name).count();
        assert_eq!(count("input"), 4);
        assert_eq!(count("keydown"), 4);
        assert_eq!(count("keyup"), 4);
        assert_eq!(count("change"), 1);
    }

    #[tokio::test]
    async fn typing_into_a_button_is_rejected() {
        let (dom, port, _, executor) = setup();
        let button = dom.add(None, "button");
        dom.set_attr(button, "id", "go");

        let err = executor
            .execute(&port, "type", &json!({"selector": "#go", "text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::InvalidTarget(_)));
        assert!(dom.event_log().is_empty());
    }

    #[tokio::test]
    async fn click_scrolls_offscreen_targets_into_view() {
        let (dom, port, _, executor) = setup();
        dom.set_content_size(1280.0, 5000.0);
        let button = dom.add(None, "button");
        dom.set_attr(button, "id", "buy");
        dom.set_rect(button, LayoutRect::new(100.0, 3000.0, 80.0, 30.0));

        executor
            .execute(&port, "click", &json!({"selector": "#buy"}))
            .await
            .unwrap();
        assert_eq!(dom.clicks(), vec![button]);
        let (_, scroll_y) = dom.scroll_offset();
        assert!(scroll_y > 0.0);
    }

    #[tokio::test]
    async fn click_highlight_is_restored_asynchronously() {
        let (dom, port, _, executor) = setup();
        let button = dom.add(None, "button");
        dom.set_attr(button, "id", "buy");
        dom.set_rect(button, LayoutRect::new(10.0, 10.0, 80.0, 30.0));

        executor
            .execute(&port, "click", &json!({"selector": "#buy"}))
            .await
            .unwrap();
        // The restore task runs after the click returns.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(dom.inline_style(button, "outline"), None);
    }

    #[tokio::test]
    async fn stale_registry_tokens_fail_with_element_not_found() {
        let (dom, port, registry, executor) = setup();
        let button = dom.add(None, "button");
        dom.set_rect(button, LayoutRect::new(0.0, 0.0, 10.0, 10.0));
        registry.begin_pass();
        let token = registry.register(button);
        registry.begin_pass();

        let err = executor
            .execute(&port, "click", &json!({"selector": token.to_string()}))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn unknown_token_fails_with_element_not_found() {
        let (_, port, registry, executor) = setup();
        registry.begin_pass();

        let err = executor
            .execute(&port, "click", &json!({"selector": "agent-id-7"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn invalid_scroll_direction_performs_no_scroll() {
        let (dom, port, _, executor) = setup();
        let err = executor
            .execute(&port, "scroll", &json!({"direction": "sideways", "amount": "medium"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::InvalidParameter(_)));
        assert_eq!(dom.scroll_offset(), (0.0, 0.0));
    }

    #[tokio::test]
    async fn page_scroll_uses_viewport_height() {
        let (dom, port, _, executor) = setup();
        dom.set_content_size(1280.0, 5000.0);
        executor
            .execute(&port, "scroll", &json!({"direction": "down", "amount": "page"}))
            .await
            .unwrap();
        assert_eq!(dom.scroll_offset(), (0.0, 720.0));
    }

    #[tokio::test]
    async fn stop_always_succeeds() {
        let (_, port, _, executor) = setup();
        let outcome = executor.execute(&port, "stop", &json!({})).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn unknown_commands_are_invalid_parameters() {
        let (_, port, _, executor) = setup();
        let err = executor
            .execute(&port, "teleport", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::InvalidParameter(_)));
    }
}
