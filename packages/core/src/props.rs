//! Plain-data node records and the items accepted by insertion methods.

use crate::error::{NodeError, NodeResult};
use crate::node::{AtRule, Comment, Declaration, Node, NodeKind, Root, Rule};
use crate::raws::Raws;
use serde::{Deserialize, Deserializer};

/// A loosely-typed node description.
///
/// The node type is picked from the fields that are present, in this order:
/// `selector` makes a rule, `name` an at-rule, `text` a comment and `prop` a
/// declaration (which then also needs `value`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeProps {
    pub prop: Option<String>,
    #[serde(deserialize_with = "value_as_string")]
    pub value: Option<String>,
    pub important: bool,
    pub selector: Option<String>,
    pub name: Option<String>,
    pub params: Option<String>,
    pub text: Option<String>,
    pub raws: Raws,
}

/// Numbers and booleans given as a declaration value become their text.
fn value_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }))
}

impl NodeProps {
    pub fn decl(prop: impl Into<String>, value: impl ToString) -> Self {
        Self {
            prop: Some(prop.into()),
            value: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn rule(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            ..Self::default()
        }
    }

    pub fn at_rule(name: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            params: Some(params.into()),
            ..Self::default()
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }

    pub fn with_raws(mut self, raws: Raws) -> Self {
        self.raws = raws;
        self
    }

    /// Variant this record describes, without building it
    pub fn shape(&self) -> NodeResult<NodeKind> {
        if self.selector.is_some() {
            Ok(NodeKind::Rule)
        } else if self.name.is_some() {
            Ok(NodeKind::AtRule)
        } else if self.text.is_some() {
            Ok(NodeKind::Comment)
        } else if self.prop.is_some() {
            if self.value.is_none() {
                return Err(NodeError::MissingValue);
            }
            Ok(NodeKind::Decl)
        } else {
            Err(NodeError::UnknownNodeType)
        }
    }

    pub fn into_node(self) -> NodeResult<Node> {
        let node: Node = match self.shape()? {
            NodeKind::Rule => Rule::new(self.selector.unwrap_or_default()).into(),
            NodeKind::AtRule => {
                AtRule::new(self.name.unwrap_or_default(), self.params.unwrap_or_default()).into()
            }
            NodeKind::Comment => Comment::new(self.text.unwrap_or_default()).into(),
            NodeKind::Decl => Declaration::new(
                self.prop.unwrap_or_default(),
                self.value.unwrap_or_default(),
            )
            .important(self.important)
            .into(),
            NodeKind::Root => return Err(NodeError::UnknownNodeType),
        };
        node.set_raws(self.raws);
        Ok(node)
    }
}

impl TryFrom<NodeProps> for Node {
    type Error = NodeError;

    fn try_from(props: NodeProps) -> NodeResult<Node> {
        props.into_node()
    }
}

/// Anything that can be handed to `append`, `prepend`, `insert_before` or
/// `insert_after`.
#[derive(Debug, Clone)]
pub enum Child {
    /// A node; a root node contributes its children instead of itself
    Node(Node),
    /// A list of nodes, inserted in order
    Nodes(Vec<Node>),
    /// A record resolved through [`NodeProps::into_node`]
    Props(NodeProps),
    /// Several items, inserted in order
    Many(Vec<Child>),
}

impl Child {
    /// Turn every item into a node. Fails before anything is inserted when a
    /// record is malformed.
    pub(crate) fn resolve(self) -> NodeResult<Vec<Node>> {
        let mut resolved = Vec::new();
        self.resolve_into(&mut resolved)?;
        Ok(resolved)
    }

    fn resolve_into(self, out: &mut Vec<Node>) -> NodeResult<()> {
        match self {
            Child::Node(node) => push_node(node, out),
            Child::Nodes(nodes) => {
                for node in nodes {
                    push_node(node, out);
                }
            }
            Child::Props(props) => out.push(props.into_node()?),
            Child::Many(items) => {
                for item in items {
                    item.resolve_into(out)?;
                }
            }
        }
        Ok(())
    }
}

fn push_node(node: Node, out: &mut Vec<Node>) {
    if node.kind() == NodeKind::Root {
        let inner = node.inner();
        if let Some(children) = inner.children.as_ref() {
            out.extend(children.nodes.iter().cloned());
        }
    } else {
        out.push(node);
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<&Node> for Child {
    fn from(node: &Node) -> Self {
        Child::Node(node.clone())
    }
}

macro_rules! child_from_handle {
    ($($handle:ty),*) => {
        $(
            impl From<$handle> for Child {
                fn from(handle: $handle) -> Self {
                    Child::Node(handle.into())
                }
            }

            impl From<&$handle> for Child {
                fn from(handle: &$handle) -> Self {
                    Child::Node(handle.clone().into())
                }
            }
        )*
    };
}

child_from_handle!(Declaration, Rule, AtRule, Comment, Root);

impl From<Vec<Node>> for Child {
    fn from(nodes: Vec<Node>) -> Self {
        Child::Nodes(nodes)
    }
}

impl From<NodeProps> for Child {
    fn from(props: NodeProps) -> Self {
        Child::Props(props)
    }
}

impl From<Vec<NodeProps>> for Child {
    fn from(records: Vec<NodeProps>) -> Self {
        Child::Many(records.into_iter().map(Child::Props).collect())
    }
}

impl From<Vec<Child>> for Child {
    fn from(items: Vec<Child>) -> Self {
        Child::Many(items)
    }
}
