//! Legacy single-shot commands.
//!
//! These predate the registry-addressed command set: each one runs its own
//! best-effort heuristic against the live document and reports whether any
//! candidate matched. They are not addressable across calls and exist only
//! as a fallback surface.

use serde_json::Value;
use tracing::debug;
use url::Url;

use trolley_core_types::AutomationError;
use trolley_dom::{DomEvent, DomPort, ElementQuery};

use crate::model::{require_str_param, sleep_ms, str_param, ExecOutcome, ExecutorTiming};
use crate::strategies;

/// Fill the search input and fire the submit path: a search button when one
/// matches, otherwise the input's enclosing form.
pub async fn search_product(
    dom: &dyn DomPort,
    params: &Value,
    timing: &ExecutorTiming,
) -> Result<ExecOutcome, AutomationError> {
    let query = require_str_param(params, &["query", "item"])?;

    let (input_strategy, input) = strategies::first_match(dom, &strategies::search_inputs())
        .await
        .ok_or_else(|| AutomationError::ElementNotFound("no search input found".into()))?;

    dom.set_value(input, &query).await?;
    dom.dispatch(input, DomEvent::Input).await?;
    sleep_ms(timing.search_submit_delay_ms).await;

    if let Some((button_strategy, button)) =
        strategies::first_match(dom, &strategies::search_buttons()).await
    {
        dom.click(button).await?;
        debug!(input_strategy, button_strategy, "search submitted via button");
    } else if let Some(form) = dom.enclosing_form(input).await? {
        dom.submit_form(form).await?;
        debug!(input_strategy, "search submitted via form");
    }

    Ok(ExecOutcome::success(format!(
        "searched for '{query}' via {input_strategy}"
    )))
}

/// Click an add-to-cart control, matched by product id, product-card text,
/// or generic button heuristics, in that order.
pub async fn add_to_cart(dom: &dyn DomPort, params: &Value) -> Result<ExecOutcome, AutomationError> {
    let identifier = require_str_param(params, &["productId", "productName"])?;

    if identifier.chars().all(|c| c.is_ascii_digit()) {
        let by_id = ElementQuery::and([
            ElementQuery::tag("button"),
            ElementQuery::descendant_of(ElementQuery::attr_equals(
                "data-product-id",
                &identifier,
            )),
        ]);
        if let Some(button) = dom.query(&by_id).await.into_iter().next() {
            dom.click(button).await?;
            return Ok(ExecOutcome::success(format!(
                "added product {identifier} to cart by id"
            )));
        }
    }

    if let Some(button) = dom
        .query(&strategies::add_button_in_card(&identifier))
        .await
        .into_iter()
        .next()
    {
        dom.click(button).await?;
        return Ok(ExecOutcome::success(format!(
            "added '{identifier}' to cart from product card"
        )));
    }

    if let Some((strategy, button)) =
        strategies::first_match(dom, &strategies::add_to_cart_generic()).await
    {
        dom.click(button).await?;
        return Ok(ExecOutcome::success(format!(
            "added to cart via {strategy}"
        )));
    }

    Err(AutomationError::ElementNotFound(format!(
        "no add-to-cart control for '{identifier}'"
    )))
}

pub async fn view_cart(dom: &dyn DomPort) -> Result<ExecOutcome, AutomationError> {
    let (strategy, target) = strategies::first_match(dom, &strategies::cart_targets())
        .await
        .ok_or_else(|| AutomationError::ElementNotFound("no cart link found".into()))?;
    dom.click(target).await?;
    Ok(ExecOutcome::success(format!("opened cart via {strategy}")))
}

/// Navigate to an absolute URL / site-relative path, or click a navigation
/// link whose text mentions the section.
pub async fn navigate_to(dom: &dyn DomPort, params: &Value) -> Result<ExecOutcome, AutomationError> {
    let destination = require_str_param(params, &["url", "section"])?;

    let is_absolute = Url::parse(&destination)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if is_absolute || destination.starts_with('/') {
        dom.navigate(&destination).await;
        return Ok(ExecOutcome::success(format!("navigated to {destination}")));
    }

    if let Some(link) = dom
        .query(&strategies::nav_link(&destination))
        .await
        .into_iter()
        .next()
    {
        dom.click(link).await?;
        return Ok(ExecOutcome::success(format!(
            "clicked navigation link for '{destination}'"
        )));
    }

    Err(AutomationError::ElementNotFound(format!(
        "no navigation target for '{destination}'"
    )))
}

/// Expand each matching filter group and toggle the option whose label
/// mentions the requested value.
pub async fn filter_products(
    dom: &dyn DomPort,
    params: &Value,
) -> Result<ExecOutcome, AutomationError> {
    let filters = params
        .get("filters")
        .and_then(|v| v.as_object())
        .ok_or_else(|| AutomationError::InvalidParameter("missing parameter 'filters'".into()))?;

    let mut applied = 0usize;
    for (name, value) in filters {
        let Some(value) = value.as_str() else {
            continue;
        };
        let Some(section) = dom
            .query(&strategies::filter_section(name))
            .await
            .into_iter()
            .next()
        else {
            continue;
        };
        dom.click(section).await?;
        if let Some(option) = dom
            .query(&strategies::filter_option(value))
            .await
            .into_iter()
            .next()
        {
            dom.click(option).await?;
            applied += 1;
        }
    }

    if applied == 0 {
        return Err(AutomationError::ElementNotFound(
            "no filters matched the page".into(),
        ));
    }
    Ok(ExecOutcome::success(format!("applied {applied} filter(s)")))
}

/// Pick a product card by ordinal ("first".."fifth"), id, or name, then
/// click its link, image, or the card itself.
pub async fn select_product(
    dom: &dyn DomPort,
    params: &Value,
) -> Result<ExecOutcome, AutomationError> {
    let identifier = str_param(params, &["productId", "productIndex", "productName"])
        .ok_or_else(|| {
            AutomationError::InvalidParameter("missing parameter 'productId'".into())
        })?;

    let cards = dom.query(&strategies::product_card()).await;
    let card = if let Some(index) = ordinal_index(&identifier) {
        cards.get(index).copied()
    } else {
        let mut found = None;
        for card in cards {
            let text = dom.text(card).await.unwrap_or_default();
            if text
                .to_ascii_lowercase()
                .contains(&identifier.to_ascii_lowercase())
            {
                found = Some(card);
                break;
            }
        }
        found
    };
    let card = card.ok_or_else(|| {
        AutomationError::ElementNotFound(format!("no product matches '{identifier}'"))
    })?;

    let target = first_descendant_of_tag(dom, card, "a")
        .await
        .or(first_descendant_of_tag(dom, card, "img").await)
        .unwrap_or(card);
    dom.click(target).await?;
    Ok(ExecOutcome::success(format!(
        "selected product '{identifier}'"
    )))
}

/// Positional ordinal words accepted by `select_product`.
fn ordinal_index(identifier: &str) -> Option<usize> {
    match identifier.to_ascii_lowercase().as_str() {
        "first" | "1st" => Some(0),
        "second" | "2nd" => Some(1),
        "third" | "3rd" => Some(2),
        "fourth" | "4th" => Some(3),
        "fifth" | "5th" => Some(4),
        _ => None,
    }
}

async fn first_descendant_of_tag(
    dom: &dyn DomPort,
    parent: trolley_dom::NodeId,
    tag: &str,
) -> Option<trolley_dom::NodeId> {
    for node in dom.descendants(parent).await {
        if let Ok(node_tag) = dom.tag(node).await {
            if node_tag == tag {
                return Some(node);
            }
        }
    }
    None
}
