//! Formatting metadata and the policy that fills it in for inserted nodes.

use crate::node::{Node, NodeKind};
use serde::{Deserialize, Serialize};

/// Whitespace and punctuation kept next to a node's semantic content.
///
/// Every field is optional: the stringifier synthesizes whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Raws {
    /// Text before the node (usually whitespace)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Text between the last child and the closing brace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Declarations: `prop` to `value` (the colon included).
    /// Rules and at-rules: selector/params to `{`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub between: Option<String>,
    /// Whether the last declaration of a block carries a `;`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semicolon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_name: Option<String>,
    /// Exact spelling of `!important`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub important: Option<String>,
    /// Comment padding after `/*`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    /// Comment padding before `*/`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    /// Root only: indentation unit for nested blocks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,
}

impl Raws {
    pub fn with_before(before: impl Into<String>) -> Self {
        Self {
            before: Some(before.into()),
            ..Self::default()
        }
    }
}

/// Keep only the whitespace of a raw fragment
pub(crate) fn whitespace_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_whitespace()).collect()
}

/// Assign `raws.before` to freshly inserted nodes that have none.
///
/// `at` is the index the first node lands on and `sample` the sibling the
/// insertion was positioned against.
pub(crate) fn fill_before(container: &Node, nodes: &[Node], at: usize, sample: Option<&Node>) {
    let container_kind = container.kind();
    let sample_before = sample.and_then(|s| s.inner().raws.before.clone());
    let sample_is_first = sample.is_some_and(|s| s.index_in_parent() == Some(0));

    for (offset, node) in nodes.iter().enumerate() {
        if node.inner().raws.before.is_some() {
            continue;
        }
        let before = if container_kind == NodeKind::Root {
            if at + offset == 0 || sample_is_first {
                // First node of a stylesheet needs no separator; a separator
                // copied from the first node would be empty as well.
                None
            } else {
                sample_before.as_deref().map(whitespace_only)
            }
        } else {
            Some(
                sample_before
                    .as_deref()
                    .map(whitespace_only)
                    .unwrap_or_else(|| " ".to_string()),
            )
        };
        node.inner_mut().raws.before = before;
    }
}

/// A node pushed off the front of a root stops being the first node of the
/// file and needs the separator its new position implies.
pub(crate) fn demote_root_first(displaced: &Node, following: Option<&Node>) {
    let before = following.and_then(|next| next.inner().raws.before.clone());
    displaced.inner_mut().raws.before = before;
}
