//! Snapshot models sent across the process boundary and on to the decision
//! service. Field names follow the wire schema the service consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Serializable description of a page's interactive surface at one point in
/// time. Rebuilt fresh on every observation; never diffed against a prior
/// snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub elements: Vec<ElementDescriptor>,
}

/// One interactive element, addressable for the lifetime of a single
/// observation pass via its opaque `id` token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    /// Registry token, e.g. `agent-id-4-12`. Weak reference: valid only
    /// until the next observation pass.
    pub id: String,
    /// Element kind derived from tag plus role or input subtype,
    /// e.g. `button`, `link`, `input-search`.
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub location: ElementLocation,
    pub is_visible: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementLocation {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub viewport_x: f64,
    pub viewport_y: f64,
    pub is_in_viewport: bool,
}
