//! Offline demo: a small synthetic grocery storefront and a scripted
//! decision sequence that buys a product from it end to end.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use trolley_command_executor::ExecutorTiming;
use trolley_coordinator::{
    DecisionPort, LoopConfig, ScriptedDecisions, SessionCoordinator, TaskEnvelope,
};
use trolley_core_types::AutomationError;
use trolley_dom::{DomPort, LayoutRect, SyntheticDom};
use trolley_element_registry::ElementRegistry;
use trolley_message_router::{page_channel, PageAgent};

/// Build the storefront the demo task runs against: search bar, a cart
/// link, and a handful of product cards.
pub fn demo_store() -> SyntheticDom {
    let dom = SyntheticDom::new("https://grocer.example/", "Example Grocer");

    let header = dom.add(None, "header");
    let search = dom.add(Some(header), "input");
    dom.set_attr(search, "type", "search");
    dom.set_attr(search, "id", "search-input");
    dom.set_attr(search, "placeholder", "Search groceries");
    dom.set_rect(search, LayoutRect::new(20.0, 10.0, 300.0, 32.0));

    let submit = dom.add(Some(header), "button");
    dom.set_attr(submit, "type", "submit");
    dom.set_text(submit, "Search");
    dom.set_rect(submit, LayoutRect::new(330.0, 10.0, 80.0, 32.0));

    let nav = dom.add(Some(header), "nav");
    let cart = dom.add(Some(nav), "a");
    dom.set_attr(cart, "href", "/cart");
    dom.set_text(cart, "Cart (0)");
    dom.set_rect(cart, LayoutRect::new(1150.0, 10.0, 90.0, 32.0));

    let main = dom.add(None, "main");
    for (index, (name, price)) in [
        ("Organic Milk 1L", "2.49"),
        ("Whole Wheat Bread", "1.89"),
        ("Free Range Eggs 12pk", "3.99"),
    ]
    .into_iter()
    .enumerate()
    {
        let y = 80.0 + index as f64 * 140.0;
        let card = dom.add(Some(main), "div");
        dom.set_attr(card, "class", "product-card");
        dom.set_attr(card, "data-product-id", &format!("{}", 100 + index));
        dom.set_rect(card, LayoutRect::new(20.0, y, 400.0, 120.0));

        let title = dom.add(Some(card), "h3");
        dom.set_text(title, name);
        dom.set_rect(title, LayoutRect::new(30.0, y + 10.0, 200.0, 24.0));

        let tag = dom.add(Some(card), "span");
        dom.set_text(tag, &format!("${price}"));

        let add = dom.add(Some(card), "button");
        dom.set_text(add, "Add to Cart");
        dom.set_rect(add, LayoutRect::new(30.0, y + 70.0, 120.0, 32.0));
    }

    dom
}

/// Scripted stand-in for the decision service: search, add to cart, open
/// the cart, report done.
pub fn demo_decisions() -> ScriptedDecisions {
    ScriptedDecisions::new(vec![
        ScriptedDecisions::step(
            "search_product",
            json!({ "query": "organic milk" }),
            "find the product the task asks for",
        ),
        ScriptedDecisions::step(
            "add_to_cart",
            json!({ "productName": "organic milk" }),
            "add the matching product",
        ),
        ScriptedDecisions::step("view_cart", json!({}), "confirm the cart contents"),
        ScriptedDecisions::done("organic milk is in the cart"),
    ])
}

/// Run one task against the demo store with the given decision source.
pub async fn run_against_demo_store(
    task: &str,
    config: LoopConfig,
    decider: Arc<dyn DecisionPort>,
) -> Result<TaskEnvelope, AutomationError> {
    let dom: Arc<dyn DomPort> = Arc::new(demo_store());
    let registry = Arc::new(ElementRegistry::new());
    let agent = PageAgent::with_timing(dom, registry, ExecutorTiming::instant());

    let (channel, stream) = page_channel(8, Duration::from_secs(10));
    let agent_handle = agent.spawn(stream);

    let coordinator = SessionCoordinator::new(config, Arc::new(channel), decider);
    let envelope = coordinator.run_task(task).await;

    drop(coordinator);
    agent_handle.await.ok();
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;
    use trolley_coordinator::SessionStatus;

    #[tokio::test]
    async fn scripted_demo_buys_milk() {
        let config = LoopConfig {
            settle_ms: 0,
            ..LoopConfig::default()
        };
        let envelope = run_against_demo_store("buy organic milk", config, Arc::new(demo_decisions()))
            .await
            .unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.session.status, SessionStatus::Completed);
        assert_eq!(envelope.session.steps.len(), 3);
        assert!(envelope.session.steps.iter().all(|s| s.result.is_success()));
    }
}
