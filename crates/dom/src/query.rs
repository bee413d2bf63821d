//! Typed element queries.
//!
//! Heuristic candidate lists are expressed as combinations of these variants
//! instead of raw CSS selector strings, so a query is matchable against any
//! `DomPort` implementation without a selector parser.

/// A predicate over live elements, evaluated in document order.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementQuery {
    /// Tag name, case-insensitive.
    Tag(String),
    /// `id` attribute equals the value exactly.
    Id(String),
    /// Attribute present with exactly this value.
    AttrEquals { name: String, value: String },
    /// Attribute present and containing the value, case-insensitive.
    AttrContains { name: String, value: String },
    /// Attribute present with any value.
    HasAttr(String),
    /// Visible text (including descendants) contains the value,
    /// case-insensitive.
    TextContains(String),
    /// Some strict ancestor matches the inner query.
    DescendantOf(Box<ElementQuery>),
    And(Vec<ElementQuery>),
    Or(Vec<ElementQuery>),
    Not(Box<ElementQuery>),
}

impl ElementQuery {
    pub fn tag(name: &str) -> Self {
        Self::Tag(name.to_string())
    }

    pub fn id(value: &str) -> Self {
        Self::Id(value.to_string())
    }

    pub fn attr_equals(name: &str, value: &str) -> Self {
        Self::AttrEquals {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn attr_contains(name: &str, value: &str) -> Self {
        Self::AttrContains {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn has_attr(name: &str) -> Self {
        Self::HasAttr(name.to_string())
    }

    pub fn class_contains(value: &str) -> Self {
        Self::attr_contains("class", value)
    }

    pub fn role(value: &str) -> Self {
        Self::attr_equals("role", value)
    }

    pub fn text_contains(value: &str) -> Self {
        Self::TextContains(value.to_string())
    }

    pub fn descendant_of(ancestor: ElementQuery) -> Self {
        Self::DescendantOf(Box::new(ancestor))
    }

    pub fn and(parts: impl IntoIterator<Item = ElementQuery>) -> Self {
        Self::And(parts.into_iter().collect())
    }

    pub fn or(parts: impl IntoIterator<Item = ElementQuery>) -> Self {
        Self::Or(parts.into_iter().collect())
    }

    pub fn not(inner: ElementQuery) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Shorthand for `<input type="...">`.
    pub fn input_of_type(subtype: &str) -> Self {
        Self::and([Self::tag("input"), Self::attr_equals("type", subtype)])
    }
}
