//! Node handles and the per-variant data they carry.
//!
//! A [`Node`] is a cheap, clonable handle onto a shared tree element. Two
//! handles compare equal only when they point at the same element, which is
//! what `index()` and the parent/child bookkeeping rely on. Children are owned
//! by their container; the link back to the parent is weak, so dropping a
//! `Root` releases the whole tree.

use crate::container::ContainerNode;
use crate::cursor::Cursors;
use crate::raws::Raws;
use crate::stringifier::Stringifier;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// Discriminant of a node, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Decl,
    Rule,
    AtRule,
    Comment,
    Root,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Decl => "decl",
            NodeKind::Rule => "rule",
            NodeKind::AtRule => "atrule",
            NodeKind::Comment => "comment",
            NodeKind::Root => "root",
        }
    }

    /// Whether nodes of this kind may own children
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Rule | NodeKind::AtRule | NodeKind::Root)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based line/column inside a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The stylesheet text a parsed tree came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub css: String,
    pub file: Option<String>,
}

impl Input {
    pub fn new(css: impl Into<String>, file: Option<String>) -> Self {
        Self {
            css: css.into(),
            file,
        }
    }

    /// File path, or a placeholder for anonymous input
    pub fn name(&self) -> &str {
        self.file.as_deref().unwrap_or("<input css>")
    }
}

/// Where a parsed node came from
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub input: Rc<Input>,
    pub start: Location,
    pub end: Option<Location>,
}

impl Source {
    pub fn new(input: Rc<Input>, start: Location) -> Self {
        Self {
            input,
            start,
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Data {
    Decl {
        prop: String,
        value: String,
        important: bool,
    },
    Rule {
        selector: String,
    },
    AtRule {
        name: String,
        params: String,
    },
    Comment {
        text: String,
    },
    Root,
}

impl Data {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Data::Decl { .. } => NodeKind::Decl,
            Data::Rule { .. } => NodeKind::Rule,
            Data::AtRule { .. } => NodeKind::AtRule,
            Data::Comment { .. } => NodeKind::Comment,
            Data::Root => NodeKind::Root,
        }
    }
}

/// Child list of a container plus the cursors of the `each` calls running on it
#[derive(Default)]
pub(crate) struct Children {
    pub(crate) nodes: Vec<Node>,
    pub(crate) cursors: Cursors,
}

pub(crate) struct NodeInner {
    pub(crate) data: Data,
    pub(crate) raws: Raws,
    pub(crate) source: Option<Source>,
    pub(crate) parent: Option<Weak<RefCell<NodeInner>>>,
    // `None` for leaves and for at-rules without a block
    pub(crate) children: Option<Children>,
}

/// Handle onto a tree element of any kind
#[derive(Clone)]
pub struct Node(pub(crate) Rc<RefCell<NodeInner>>);

impl Node {
    pub(crate) fn from_data(data: Data, with_children: bool) -> Self {
        Node(Rc::new(RefCell::new(NodeInner {
            data,
            raws: Raws::default(),
            source: None,
            parent: None,
            children: with_children.then(Children::default),
        })))
    }

    pub(crate) fn inner(&self) -> Ref<'_, NodeInner> {
        self.0.borrow()
    }

    pub(crate) fn inner_mut(&self) -> RefMut<'_, NodeInner> {
        self.0.borrow_mut()
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<NodeInner>> {
        Rc::downgrade(&self.0)
    }

    pub fn kind(&self) -> NodeKind {
        self.inner().data.kind()
    }

    pub fn is_container(&self) -> bool {
        self.kind().is_container()
    }

    /// True when the node currently owns a child list (at-rules without a
    /// block have none)
    pub fn has_block(&self) -> bool {
        self.inner().children.is_some()
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn parent(&self) -> Option<ContainerNode> {
        self.parent_node().map(ContainerNode::from_parent)
    }

    pub(crate) fn parent_node(&self) -> Option<Node> {
        self.inner()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Node)
    }

    /// Topmost ancestor, or the node itself when detached
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent_node() {
            current = parent;
        }
        current
    }

    pub fn raws(&self) -> Raws {
        self.inner().raws.clone()
    }

    pub fn set_raws(&self, raws: Raws) {
        self.inner_mut().raws = raws;
    }

    pub fn update_raws(&self, update: impl FnOnce(&mut Raws)) {
        update(&mut self.inner_mut().raws);
    }

    pub fn source(&self) -> Option<Source> {
        self.inner().source.clone()
    }

    pub fn set_source(&self, source: Option<Source>) {
        self.inner_mut().source = source;
    }

    /// Record the end location of a node whose source is already set
    pub fn set_source_end(&self, end: Location) {
        if let Some(source) = self.inner_mut().source.as_mut() {
            source.end = Some(end);
        }
    }

    /// Position among the parent's children
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent_node()?;
        let inner = parent.inner();
        inner
            .children
            .as_ref()?
            .nodes
            .iter()
            .position(|child| child.ptr_eq(self))
    }

    pub fn next(&self) -> Option<Node> {
        let index = self.index_in_parent()?;
        let parent = self.parent_node()?;
        let inner = parent.inner();
        inner.children.as_ref()?.nodes.get(index + 1).cloned()
    }

    pub fn prev(&self) -> Option<Node> {
        let index = self.index_in_parent()?.checked_sub(1)?;
        let parent = self.parent_node()?;
        let inner = parent.inner();
        inner.children.as_ref()?.nodes.get(index).cloned()
    }

    /// Detach from the parent. Running `each` calls on the parent are kept
    /// in step, so removing the node being visited is safe.
    pub fn remove(&self) -> &Self {
        if let Some(parent) = self.parent() {
            let removed = crate::container::remove_child(&parent, &self.clone().into());
            debug_assert!(removed.is_ok(), "parent does not list its child");
        }
        self
    }

    /// Put `items` where this node is and detach it
    pub fn replace_with(&self, items: impl Into<crate::props::Child>) -> crate::NodeResult<&Self> {
        if let Some(parent) = self.parent() {
            crate::container::insert(
                &parent,
                crate::container::Anchor::Before(self.clone().into()),
                items.into(),
            )?;
            self.remove();
        }
        Ok(self)
    }

    /// Detached copy of this node and all of its descendants, raws included
    pub fn deep_clone(&self) -> Node {
        let inner = self.inner();
        let copy = Node(Rc::new(RefCell::new(NodeInner {
            data: inner.data.clone(),
            raws: inner.raws.clone(),
            source: inner.source.clone(),
            parent: None,
            children: inner.children.as_ref().map(|_| Children::default()),
        })));
        if let Some(children) = inner.children.as_ref() {
            let cloned: Vec<Node> = children.nodes.iter().map(Node::deep_clone).collect();
            let mut copy_inner = copy.inner_mut();
            for child in &cloned {
                child.inner_mut().parent = Some(copy.downgrade());
            }
            if let Some(list) = copy_inner.children.as_mut() {
                list.nodes = cloned;
            }
        }
        drop(inner);
        copy
    }

    pub fn as_decl(&self) -> Option<Declaration> {
        (self.kind() == NodeKind::Decl).then(|| Declaration(self.clone()))
    }

    pub fn as_rule(&self) -> Option<Rule> {
        (self.kind() == NodeKind::Rule).then(|| Rule(self.clone()))
    }

    pub fn as_at_rule(&self) -> Option<AtRule> {
        (self.kind() == NodeKind::AtRule).then(|| AtRule(self.clone()))
    }

    pub fn as_comment(&self) -> Option<Comment> {
        (self.kind() == NodeKind::Comment).then(|| Comment(self.clone()))
    }

    pub fn as_root(&self) -> Option<Root> {
        (self.kind() == NodeKind::Root).then(|| Root(self.clone()))
    }

    pub fn as_container(&self) -> Option<ContainerNode> {
        self.is_container()
            .then(|| ContainerNode::from_parent(self.clone()))
    }

    /// Short human-readable label, used in logs and `Debug`
    pub(crate) fn label(&self) -> String {
        match &self.inner().data {
            Data::Decl { prop, value, .. } => format!("decl({prop}: {value})"),
            Data::Rule { selector } => format!("rule({selector})"),
            Data::AtRule { name, params } => format!("atrule(@{name} {params})"),
            Data::Comment { text } => format!("comment({text})"),
            Data::Root => "root".to_string(),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Stringifier::new().stringify(self))
    }
}

macro_rules! node_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(pub(crate) Node);

        impl $name {
            pub fn into_node(self) -> Node {
                self.0
            }

            pub fn with_raws(self, raws: Raws) -> Self {
                self.0.set_raws(raws);
                self
            }

            pub fn with_source(self, source: Source) -> Self {
                self.0.set_source(Some(source));
                self
            }
        }

        impl Deref for $name {
            type Target = Node;

            fn deref(&self) -> &Node {
                &self.0
            }
        }

        impl AsRef<Node> for $name {
            fn as_ref(&self) -> &Node {
                &self.0
            }
        }

        impl From<$name> for Node {
            fn from(handle: $name) -> Node {
                handle.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(&self.0, f)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

node_handle!(
    /// `prop: value` pair, optionally `!important`
    Declaration
);
node_handle!(
    /// Selector plus a block of children
    Rule
);
node_handle!(
    /// `@name params`, with or without a block
    AtRule
);
node_handle!(Comment);
node_handle!(
    /// Top of a stylesheet tree
    Root
);

impl Declaration {
    pub fn new(prop: impl Into<String>, value: impl ToString) -> Self {
        Declaration(Node::from_data(
            Data::Decl {
                prop: prop.into(),
                value: value.to_string(),
                important: false,
            },
            false,
        ))
    }

    pub fn important(self, important: bool) -> Self {
        self.set_important(important);
        self
    }

    pub fn prop(&self) -> String {
        match &self.inner().data {
            Data::Decl { prop, .. } => prop.clone(),
            _ => unreachable!("declaration handle over a non-declaration"),
        }
    }

    pub fn value(&self) -> String {
        match &self.inner().data {
            Data::Decl { value, .. } => value.clone(),
            _ => unreachable!("declaration handle over a non-declaration"),
        }
    }

    pub fn is_important(&self) -> bool {
        matches!(self.inner().data, Data::Decl { important: true, .. })
    }

    pub fn set_prop(&self, new_prop: impl Into<String>) {
        if let Data::Decl { prop, .. } = &mut self.inner_mut().data {
            *prop = new_prop.into();
        }
    }

    pub fn set_value(&self, new_value: impl ToString) {
        if let Data::Decl { value, .. } = &mut self.inner_mut().data {
            *value = new_value.to_string();
        }
    }

    pub fn set_important(&self, flag: bool) {
        if let Data::Decl { important, .. } = &mut self.inner_mut().data {
            *important = flag;
        }
    }
}

impl Rule {
    pub fn new(selector: impl Into<String>) -> Self {
        Rule(Node::from_data(
            Data::Rule {
                selector: selector.into(),
            },
            true,
        ))
    }

    pub fn selector(&self) -> String {
        match &self.inner().data {
            Data::Rule { selector } => selector.clone(),
            _ => unreachable!("rule handle over a non-rule"),
        }
    }

    pub fn set_selector(&self, new_selector: impl Into<String>) {
        if let Data::Rule { selector } = &mut self.inner_mut().data {
            *selector = new_selector.into();
        }
    }
}

impl AtRule {
    /// At-rule without a block; appending a child gives it one
    pub fn new(name: impl Into<String>, params: impl Into<String>) -> Self {
        AtRule(Node::from_data(
            Data::AtRule {
                name: name.into(),
                params: params.into(),
            },
            false,
        ))
    }

    /// At-rule with an empty block, rendered as `@name params {}`
    pub fn with_block(name: impl Into<String>, params: impl Into<String>) -> Self {
        let at_rule = Self::new(name, params);
        at_rule.inner_mut().children = Some(Children::default());
        at_rule
    }

    pub fn name(&self) -> String {
        match &self.inner().data {
            Data::AtRule { name, .. } => name.clone(),
            _ => unreachable!("at-rule handle over a non-at-rule"),
        }
    }

    pub fn params(&self) -> String {
        match &self.inner().data {
            Data::AtRule { params, .. } => params.clone(),
            _ => unreachable!("at-rule handle over a non-at-rule"),
        }
    }

    pub fn set_name(&self, new_name: impl Into<String>) {
        if let Data::AtRule { name, .. } = &mut self.inner_mut().data {
            *name = new_name.into();
        }
    }

    pub fn set_params(&self, new_params: impl Into<String>) {
        if let Data::AtRule { params, .. } = &mut self.inner_mut().data {
            *params = new_params.into();
        }
    }
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Comment(Node::from_data(Data::Comment { text: text.into() }, false))
    }

    pub fn text(&self) -> String {
        match &self.inner().data {
            Data::Comment { text } => text.clone(),
            _ => unreachable!("comment handle over a non-comment"),
        }
    }

    pub fn set_text(&self, new_text: impl Into<String>) {
        if let Data::Comment { text } = &mut self.inner_mut().data {
            *text = new_text.into();
        }
    }
}

impl Root {
    pub fn new() -> Self {
        Root(Node::from_data(Data::Root, true))
    }
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}
