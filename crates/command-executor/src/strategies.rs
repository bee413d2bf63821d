//! Ordered heuristic strategy tables for the legacy commands.
//!
//! Each table is tried in sequence against the live document; the first
//! strategy with a match wins. Site-specific heuristics are added by
//! extending a table, never by branching inside the command logic.

use trolley_dom::{DomPort, ElementQuery, NodeId};

/// One named candidate in a heuristic table.
#[derive(Clone, Debug)]
pub struct Strategy {
    pub name: &'static str,
    pub query: ElementQuery,
}

impl Strategy {
    pub fn new(name: &'static str, query: ElementQuery) -> Self {
        Self { name, query }
    }
}

/// Try the table in order; first strategy with a hit wins, and within a
/// strategy the first document-order match is taken.
pub async fn first_match(dom: &dyn DomPort, table: &[Strategy]) -> Option<(&'static str, NodeId)> {
    for strategy in table {
        if let Some(node) = dom.query(&strategy.query).await.into_iter().next() {
            return Some((strategy.name, node));
        }
    }
    None
}

pub fn search_inputs() -> Vec<Strategy> {
    vec![
        Strategy::new("input[type=search]", ElementQuery::input_of_type("search")),
        Strategy::new(
            "input[placeholder*=search]",
            ElementQuery::and([
                ElementQuery::tag("input"),
                ElementQuery::attr_contains("placeholder", "search"),
            ]),
        ),
        Strategy::new(
            "input[aria-label*=search]",
            ElementQuery::and([
                ElementQuery::tag("input"),
                ElementQuery::attr_contains("aria-label", "search"),
            ]),
        ),
        Strategy::new("#search-input", ElementQuery::id("search-input")),
        Strategy::new(
            "input[name=search]",
            ElementQuery::and([
                ElementQuery::tag("input"),
                ElementQuery::attr_equals("name", "search"),
            ]),
        ),
    ]
}

pub fn search_buttons() -> Vec<Strategy> {
    vec![
        Strategy::new(
            "button[type=submit]",
            ElementQuery::and([
                ElementQuery::tag("button"),
                ElementQuery::attr_equals("type", "submit"),
            ]),
        ),
        Strategy::new(
            "button[aria-label*=search]",
            ElementQuery::and([
                ElementQuery::tag("button"),
                ElementQuery::attr_contains("aria-label", "search"),
            ]),
        ),
        Strategy::new("#search-btn", ElementQuery::id("search-btn")),
        Strategy::new(
            ".search-btn",
            ElementQuery::and([
                ElementQuery::tag("button"),
                ElementQuery::class_contains("search-btn"),
            ]),
        ),
    ]
}

pub fn cart_targets() -> Vec<Strategy> {
    vec![
        Strategy::new(
            "a[href*=cart]",
            ElementQuery::and([
                ElementQuery::tag("a"),
                ElementQuery::attr_contains("href", "cart"),
            ]),
        ),
        Strategy::new(
            "a[aria-label*=cart]",
            ElementQuery::and([
                ElementQuery::tag("a"),
                ElementQuery::attr_contains("aria-label", "cart"),
            ]),
        ),
        Strategy::new(
            "button[aria-label*=cart]",
            ElementQuery::and([
                ElementQuery::tag("button"),
                ElementQuery::attr_contains("aria-label", "cart"),
            ]),
        ),
    ]
}

/// Product container heuristic shared by `add_to_cart` and
/// `select_product`.
pub fn product_card() -> ElementQuery {
    ElementQuery::or([
        ElementQuery::class_contains("product-card"),
        ElementQuery::class_contains("product-item"),
        ElementQuery::has_attr("data-product"),
    ])
}

/// Enabled buttons inside a product card whose text mentions the product.
pub fn add_button_in_card(product_text: &str) -> ElementQuery {
    ElementQuery::and([
        ElementQuery::tag("button"),
        ElementQuery::not(ElementQuery::has_attr("disabled")),
        ElementQuery::descendant_of(ElementQuery::and([
            product_card(),
            ElementQuery::text_contains(product_text),
        ])),
    ])
}

pub fn add_to_cart_generic() -> Vec<Strategy> {
    let enabled_button = || {
        ElementQuery::and([
            ElementQuery::tag("button"),
            ElementQuery::not(ElementQuery::has_attr("disabled")),
        ])
    };
    vec![
        Strategy::new(
            "button[aria-label*=add to cart]",
            ElementQuery::and([
                enabled_button(),
                ElementQuery::attr_contains("aria-label", "add to cart"),
            ]),
        ),
        Strategy::new(
            "button[title*=add to cart]",
            ElementQuery::and([
                enabled_button(),
                ElementQuery::attr_contains("title", "add to cart"),
            ]),
        ),
        Strategy::new(
            "button:text(add to cart)",
            ElementQuery::and([enabled_button(), ElementQuery::text_contains("add to cart")]),
        ),
        Strategy::new(
            "button:text(add to bag)",
            ElementQuery::and([enabled_button(), ElementQuery::text_contains("add to bag")]),
        ),
    ]
}

/// Links inside navigation chrome whose text mentions the section.
pub fn nav_link(section: &str) -> ElementQuery {
    ElementQuery::and([
        ElementQuery::tag("a"),
        ElementQuery::text_contains(section),
        ElementQuery::descendant_of(ElementQuery::or([
            ElementQuery::tag("nav"),
            ElementQuery::tag("header"),
            ElementQuery::class_contains("navigation"),
        ])),
    ])
}

/// Filter group containers mentioning the filter name.
pub fn filter_section(name: &str) -> ElementQuery {
    ElementQuery::and([
        ElementQuery::or([
            ElementQuery::class_contains("filter"),
            ElementQuery::class_contains("refinement"),
            ElementQuery::has_attr("data-filter"),
        ]),
        ElementQuery::text_contains(name),
    ])
}

/// Checkbox/radio options whose label text mentions the filter value.
pub fn filter_option(value: &str) -> ElementQuery {
    ElementQuery::and([
        ElementQuery::or([
            ElementQuery::input_of_type("checkbox"),
            ElementQuery::input_of_type("radio"),
        ]),
        ElementQuery::descendant_of(ElementQuery::and([
            ElementQuery::tag("label"),
            ElementQuery::text_contains(value),
        ])),
    ])
}
