//! Heuristic classification of login form fields.
//!
//! Hosts describe the current screen as a tree of [`ScreenNode`]s with no
//! reliable annotations. The classifier guesses which editable node takes the
//! username and which takes the password.
//!
//! Algorithm Structure:
//! 1. Collect every editable node and every label node (depth-first)
//! 2. For each editable node, find the nearest label above and/or left of it
//! 3. Priority-ordered hint matching, first match locks each target
//! 4. Last resort: exactly two editable nodes, upper = username, lower = password
//!
//! The username and password targets lock independently, so one field whose
//! hints satisfy both heuristics is returned for both roles. This ambiguity
//! is kept on purpose; callers that care can compare the two handles.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Input-type bitmask values, as reported by the host toolkit.
pub mod input_type {
    /// Mask selecting the input class.
    pub const TYPE_MASK_CLASS: u32 = 0x0000_000f;
    /// Plain text class.
    pub const TYPE_CLASS_TEXT: u32 = 0x0000_0001;
    /// Email address variation of the text class.
    pub const TYPE_TEXT_VARIATION_EMAIL_ADDRESS: u32 = 0x0000_0020;
    /// Password variation of the text class.
    pub const TYPE_TEXT_VARIATION_PASSWORD: u32 = 0x0000_0080;
}

/// Opaque reference to an input element on the host's current screen.
///
/// Only meaningful for the duration of one fill request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldHandle(pub String);

impl FieldHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a node is, as far as classification cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An editable text input.
    Editable,
    /// A static text label.
    Label,
    /// Containers, buttons, images...
    #[default]
    Other,
}

/// Explicit semantic hints a host may attach to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutofillHint {
    Username,
    EmailAddress,
    Password,
    #[serde(other)]
    Unknown,
}

/// Bounding box in screen coordinates. Only used for distance heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Structural hints attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldHints {
    pub autofill_hints: Vec<AutofillHint>,
    pub resource_id: Option<String>,
    pub hint_text: Option<String>,
    pub input_type: u32,
}

/// One node of the host's screen description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenNode {
    pub handle: Option<FieldHandle>,
    pub kind: NodeKind,
    pub bounds: Rect,
    pub hints: FieldHints,
    /// Visible text, used for label nodes.
    pub text: Option<String>,
    pub children: Vec<ScreenNode>,
}

/// Best guess at the login form's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub username: Option<FieldHandle>,
    pub password: Option<FieldHandle>,
}

impl ClassificationResult {
    /// True when nothing was identified and the fill must be aborted.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// A collected node plus its precomputed center.
#[derive(Debug, Clone, Copy)]
struct Located<'a> {
    node: &'a ScreenNode,
    center_x: f32,
    center_y: f32,
}

impl<'a> Located<'a> {
    fn new(node: &'a ScreenNode) -> Self {
        let (center_x, center_y) = node.bounds.center();
        Self {
            node,
            center_x,
            center_y,
        }
    }

    fn distance_to(&self, other: &Located<'_>) -> f32 {
        let dx = self.center_x - other.center_x;
        let dy = self.center_y - other.center_y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Classify the fields of one screen.
///
/// `site_domain` is accepted for diagnostics only; classification itself does
/// not depend on it.
pub fn classify(tree: &ScreenNode, site_domain: Option<&str>) -> ClassificationResult {
    let (inputs, labels) = collect(tree);

    let mut username: Option<FieldHandle> = None;
    let mut password: Option<FieldHandle> = None;

    for field in &inputs {
        let Some(handle) = field.node.handle.as_ref() else {
            continue;
        };
        let label = nearest_label_text(field, &labels);

        if username.is_none() && looks_like_username(&field.node.hints, &label) {
            username = Some(handle.clone());
        }
        if password.is_none() && looks_like_password(&field.node.hints, &label) {
            password = Some(handle.clone());
        }
    }

    if username.is_none() && password.is_none() && inputs.len() == 2 {
        debug!("no field identified by hints, guessing from vertical order");
        let mut ordered = inputs.clone();
        ordered.sort_by(|a, b| a.node.bounds.top.total_cmp(&b.node.bounds.top));
        username = ordered[0].node.handle.clone();
        password = ordered[1].node.handle.clone();
    }

    let result = ClassificationResult { username, password };
    debug!(
        site_domain = site_domain.unwrap_or(""),
        inputs = inputs.len(),
        labels = labels.len(),
        username_found = result.username.is_some(),
        password_found = result.password.is_some(),
        "classified screen"
    );
    result
}

/// Depth-first collection of editable inputs (with a handle) and labels.
fn collect(tree: &ScreenNode) -> (Vec<Located<'_>>, Vec<Located<'_>>) {
    let mut inputs = Vec::new();
    let mut labels = Vec::new();
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        match node.kind {
            NodeKind::Editable if node.handle.is_some() => inputs.push(Located::new(node)),
            NodeKind::Label => labels.push(Located::new(node)),
            _ => {}
        }
        // Reverse so the first child is visited first.
        stack.extend(node.children.iter().rev());
    }

    (inputs, labels)
}

/// Lower-cased text of the closest label above and/or left of `field`.
fn nearest_label_text(field: &Located<'_>, labels: &[Located<'_>]) -> String {
    labels
        .iter()
        .filter(|label| label.center_x <= field.center_x || label.center_y <= field.center_y)
        .min_by(|a, b| a.distance_to(field).total_cmp(&b.distance_to(field)))
        .and_then(|label| label.node.text.as_deref())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

fn looks_like_username(hints: &FieldHints, label: &str) -> bool {
    if hints
        .autofill_hints
        .iter()
        .any(|h| matches!(h, AutofillHint::Username | AutofillHint::EmailAddress))
    {
        return true;
    }
    if text_sources(hints, label)
        .iter()
        .any(|text| text.contains("email") || text.contains("user"))
    {
        return true;
    }
    has_text_variation(hints.input_type, input_type::TYPE_TEXT_VARIATION_EMAIL_ADDRESS)
}

fn looks_like_password(hints: &FieldHints, label: &str) -> bool {
    if hints.autofill_hints.contains(&AutofillHint::Password) {
        return true;
    }
    if text_sources(hints, label)
        .iter()
        .any(|text| text.contains("password"))
    {
        return true;
    }
    has_text_variation(hints.input_type, input_type::TYPE_TEXT_VARIATION_PASSWORD)
}

/// Resource id, hint text and nearest label, all lower-cased.
fn text_sources(hints: &FieldHints, label: &str) -> [String; 3] {
    [
        hints.resource_id.as_deref().unwrap_or("").to_lowercase(),
        hints.hint_text.as_deref().unwrap_or("").to_lowercase(),
        label.to_string(),
    ]
}

/// Text class with all bits of `variation` set.
fn has_text_variation(bits: u32, variation: u32) -> bool {
    bits & input_type::TYPE_MASK_CLASS == input_type::TYPE_CLASS_TEXT && bits & variation == variation
}

/// Input for [`classify_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyInput {
    pub screen: ScreenNode,
    /// Only logged. Domain scoping happens when credentials are matched.
    #[serde(default)]
    pub site_domain: Option<String>,
}

/// Classify a screen from JSON input (convenience function for FFI).
///
/// `siteDomain` may be omitted; the result is the same either way.
pub fn classify_json(input_json: &str) -> Result<String, String> {
    let input: ClassifyInput = serde_json::from_str(input_json).map_err(|e| e.to_string())?;
    let output = classify(&input.screen, input.site_domain.as_deref());
    serde_json::to_string(&output).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests;
