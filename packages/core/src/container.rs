//! # Container mutation API
//!
//! Rules, at-rules and roots own an ordered child list. Everything that
//! changes that list goes through this module so that:
//!
//! 1. every child's parent link points back at its container,
//! 2. a node is never owned by two containers (inserting a node that already
//!    has a parent detaches it first),
//! 3. cursors of `each` calls running on the container are shifted in step
//!    with the change (see [`crate::cursor`]),
//! 4. inserted nodes without formatting get a `before` raw (see
//!    [`crate::raws`]); `push` skips this step.
//!
//! Every failure is raised before the list is touched.

use crate::cursor::each_child;
use crate::error::{NodeError, NodeResult, TraversalError};
use crate::node::{AtRule, Children, Comment, Declaration, Node, NodeKind, Root, Rule};
use crate::props::Child;
use crate::raws;
use crate::replace::{self, ReplaceOptions, ValuePattern};
use crate::walk::{infallible, walk_tree, walk_typed, Flow, Matcher};
use std::convert::Infallible;
use std::fmt;
use std::ops::Deref;
use tracing::debug;

/// A child position: either an index or the child node itself
#[derive(Debug, Clone)]
pub enum Position {
    Index(usize),
    Node(Node),
}

impl From<usize> for Position {
    fn from(index: usize) -> Self {
        Position::Index(index)
    }
}

impl From<Node> for Position {
    fn from(node: Node) -> Self {
        Position::Node(node)
    }
}

impl From<&Node> for Position {
    fn from(node: &Node) -> Self {
        Position::Node(node.clone())
    }
}

macro_rules! position_from_handle {
    ($($handle:ty),*) => {
        $(
            impl From<$handle> for Position {
                fn from(handle: $handle) -> Self {
                    Position::Node(handle.into())
                }
            }

            impl From<&$handle> for Position {
                fn from(handle: &$handle) -> Self {
                    Position::Node(handle.clone().into())
                }
            }
        )*
    };
}

position_from_handle!(Declaration, Rule, AtRule, Comment, Root, ContainerNode);

pub(crate) enum Anchor {
    Start,
    End,
    Before(Position),
    After(Position),
}

pub(crate) fn child_at(container: &Node, index: usize) -> Option<Node> {
    container
        .inner()
        .children
        .as_ref()
        .and_then(|children| children.nodes.get(index).cloned())
}

pub(crate) fn child_count(container: &Node) -> usize {
    container
        .inner()
        .children
        .as_ref()
        .map_or(0, |children| children.nodes.len())
}

pub(crate) fn snapshot(container: &Node) -> Vec<Node> {
    container
        .inner()
        .children
        .as_ref()
        .map(|children| children.nodes.clone())
        .unwrap_or_default()
}

/// Resolve a position to an index. Indices pass through unchanged; nodes are
/// looked up by identity.
pub(crate) fn resolve_index(container: &Node, target: &Position) -> NodeResult<usize> {
    match target {
        Position::Index(index) => Ok(*index),
        Position::Node(node) => container
            .inner()
            .children
            .as_ref()
            .and_then(|children| children.nodes.iter().position(|child| child.ptr_eq(node)))
            .ok_or(NodeError::NotAChild),
    }
}

fn detach(node: &Node) -> NodeResult<()> {
    if let Some(parent) = node.parent_node() {
        remove_child(&parent, &Position::Node(node.clone()))?;
    }
    Ok(())
}

/// Append without formatting normalization
pub(crate) fn push(container: &Node, node: Node) -> NodeResult<()> {
    ensure_acyclic(container, std::slice::from_ref(&node))?;
    detach(&node)?;
    node.inner_mut().parent = Some(container.downgrade());
    container
        .inner_mut()
        .children
        .get_or_insert_with(Children::default)
        .nodes
        .push(node);
    Ok(())
}

/// Keep the first occurrence of every node
fn dedupe(nodes: &mut Vec<Node>) {
    let mut seen: Vec<Node> = Vec::with_capacity(nodes.len());
    nodes.retain(|node| {
        if seen.iter().any(|known| known.ptr_eq(node)) {
            false
        } else {
            seen.push(node.clone());
            true
        }
    });
}

fn ensure_acyclic(container: &Node, nodes: &[Node]) -> NodeResult<()> {
    let mut ancestor = Some(container.clone());
    while let Some(current) = ancestor {
        if nodes.iter().any(|node| node.ptr_eq(&current)) {
            return Err(NodeError::CyclicInsert);
        }
        ancestor = current.parent_node();
    }
    Ok(())
}

pub(crate) fn insert(container: &Node, anchor: Anchor, items: Child) -> NodeResult<()> {
    let mut nodes = items.resolve()?;
    dedupe(&mut nodes);
    ensure_acyclic(container, &nodes)?;

    let len = child_count(container);
    let (mut at, sample) = match &anchor {
        Anchor::Start => (0, child_at(container, 0)),
        Anchor::End => (len, len.checked_sub(1).and_then(|last| child_at(container, last))),
        Anchor::Before(target) => {
            let index = resolve_index(container, target)?;
            if index > len {
                return Err(NodeError::IndexOutOfBounds { index, len });
            }
            (index, child_at(container, index))
        }
        Anchor::After(target) => {
            let index = resolve_index(container, target)?;
            if index >= len {
                return Err(NodeError::IndexOutOfBounds { index, len });
            }
            (index + 1, child_at(container, index))
        }
    };
    if nodes.is_empty() {
        return Ok(());
    }

    for node in &nodes {
        match node.parent_node() {
            Some(parent) if parent.ptr_eq(container) => {
                let index = resolve_index(container, &Position::Node(node.clone()))?;
                remove_child(container, &Position::Index(index))?;
                if index < at {
                    at -= 1;
                }
            }
            Some(parent) => {
                remove_child(&parent, &Position::Node(node.clone()))?;
            }
            None => {}
        }
    }

    raws::fill_before(container, &nodes, at, sample.as_ref());
    if matches!(anchor, Anchor::Start) && container.kind() == NodeKind::Root {
        if let Some(first) = child_at(container, 0) {
            raws::demote_root_first(&first, child_at(container, 1).as_ref());
        }
    }

    let count = nodes.len();
    {
        let mut inner = container.inner_mut();
        let children = inner.children.get_or_insert_with(Children::default);
        children.cursors.shift_inserted(at, count);
        children.nodes.splice(at..at, nodes.iter().cloned());
    }
    for node in &nodes {
        node.inner_mut().parent = Some(container.downgrade());
    }
    debug!(container = ?container, at, count, "inserted nodes");
    Ok(())
}

pub(crate) fn remove_child(container: &Node, target: &Position) -> NodeResult<Node> {
    let index = resolve_index(container, target)?;
    let removed = {
        let mut inner = container.inner_mut();
        let Some(children) = inner.children.as_mut() else {
            return Err(NodeError::IndexOutOfBounds { index, len: 0 });
        };
        let len = children.nodes.len();
        if index >= len {
            return Err(NodeError::IndexOutOfBounds { index, len });
        }
        children.cursors.shift_removed(index);
        children.nodes.remove(index)
    };
    removed.inner_mut().parent = None;
    debug!(container = ?container, index, node = ?removed, "removed child");
    Ok(removed)
}

pub(crate) fn remove_all(container: &Node) -> Vec<Node> {
    let removed = {
        let mut inner = container.inner_mut();
        match inner.children.as_mut() {
            Some(children) => {
                let removed = std::mem::take(&mut children.nodes);
                children.cursors.shift_cleared(removed.len());
                removed
            }
            None => Vec::new(),
        }
    };
    for node in &removed {
        node.inner_mut().parent = None;
    }
    debug!(container = ?container, count = removed.len(), "removed all children");
    removed
}

/// Swap the whole child list. Running `each` calls keep their cursor index
/// and continue against the new list.
pub(crate) fn set_nodes(container: &Node, mut nodes: Vec<Node>) -> NodeResult<()> {
    dedupe(&mut nodes);
    ensure_acyclic(container, &nodes)?;

    // Nodes owned elsewhere leave their old parent first; nodes already in
    // this container stay put until the list is swapped below.
    for node in &nodes {
        match node.parent_node() {
            Some(parent) if parent.ptr_eq(container) => {}
            Some(_) => detach(node)?,
            None => {}
        }
    }
    let old = {
        let mut inner = container.inner_mut();
        let children = inner.children.get_or_insert_with(Children::default);
        std::mem::replace(&mut children.nodes, nodes.clone())
    };
    for node in &old {
        node.inner_mut().parent = None;
    }
    for node in &nodes {
        node.inner_mut().parent = Some(container.downgrade());
    }
    debug!(container = ?container, count = nodes.len(), "replaced child list");
    Ok(())
}

#[cfg(test)]
pub(crate) fn active_cursors(container: &Node) -> usize {
    container
        .inner()
        .children
        .as_ref()
        .map_or(0, |children| children.cursors.len())
}

/// Operations shared by every node that owns children
pub trait Container {
    fn as_node(&self) -> &Node;

    /// Current children, in order
    fn nodes(&self) -> Vec<Node> {
        snapshot(self.as_node())
    }

    fn len(&self) -> usize {
        child_count(self.as_node())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first(&self) -> Option<Node> {
        child_at(self.as_node(), 0)
    }

    fn last(&self) -> Option<Node> {
        let len = self.len();
        len.checked_sub(1)
            .and_then(|index| child_at(self.as_node(), index))
    }

    /// Append `node` as-is: no formatting is filled in. Used to build trees
    /// whose raws are already complete.
    fn push(&self, node: impl Into<Node>) -> NodeResult<&Self> {
        push(self.as_node(), node.into())?;
        Ok(self)
    }

    fn append(&self, items: impl Into<Child>) -> NodeResult<&Self> {
        insert(self.as_node(), Anchor::End, items.into())?;
        Ok(self)
    }

    /// Insert at the front; several items keep their order
    fn prepend(&self, items: impl Into<Child>) -> NodeResult<&Self> {
        insert(self.as_node(), Anchor::Start, items.into())?;
        Ok(self)
    }

    fn insert_before(
        &self,
        target: impl Into<Position>,
        items: impl Into<Child>,
    ) -> NodeResult<&Self> {
        insert(self.as_node(), Anchor::Before(target.into()), items.into())?;
        Ok(self)
    }

    fn insert_after(
        &self,
        target: impl Into<Position>,
        items: impl Into<Child>,
    ) -> NodeResult<&Self> {
        insert(self.as_node(), Anchor::After(target.into()), items.into())?;
        Ok(self)
    }

    fn remove_child(&self, target: impl Into<Position>) -> NodeResult<&Self> {
        remove_child(self.as_node(), &target.into())?;
        Ok(self)
    }

    fn remove_all(&self) -> &Self {
        remove_all(self.as_node());
        self
    }

    /// Index of a child. An index argument is returned unchanged; a node that
    /// is not a child of this container is an error.
    fn index(&self, target: impl Into<Position>) -> NodeResult<usize> {
        resolve_index(self.as_node(), &target.into())
    }

    /// Replace the child list wholesale
    fn set_nodes(&self, nodes: Vec<Node>) -> NodeResult<&Self> {
        set_nodes(self.as_node(), nodes)?;
        Ok(self)
    }

    fn every(&self, mut predicate: impl FnMut(&Node, usize) -> bool) -> bool {
        self.nodes()
            .iter()
            .enumerate()
            .all(|(index, node)| predicate(node, index))
    }

    fn some(&self, mut predicate: impl FnMut(&Node, usize) -> bool) -> bool {
        self.nodes()
            .iter()
            .enumerate()
            .any(|(index, node)| predicate(node, index))
    }

    /// Visit direct children. The callback may insert or remove children of
    /// this container; every child present throughout is visited once.
    fn each<F, R>(&self, mut visit: F) -> Flow
    where
        F: FnMut(&Node, usize) -> R,
        R: Into<Flow>,
    {
        match self.try_each(|node, index| Ok::<R, Infallible>(visit(node, index))) {
            Ok(flow) => flow,
            Err(never) => match never {},
        }
    }

    fn try_each<F, R, E>(&self, mut visit: F) -> Result<Flow, E>
    where
        F: FnMut(&Node, usize) -> Result<R, E>,
        R: Into<Flow>,
    {
        each_child(self.as_node(), &mut |node: &Node, index: usize| {
            visit(node, index).map(Into::into)
        })
    }

    /// Visit every descendant, parents before their children
    fn walk<F, R>(&self, mut visit: F) -> Flow
    where
        F: FnMut(&Node, usize) -> R,
        R: Into<Flow>,
    {
        infallible(self.try_walk(|node, index| Ok::<R, Infallible>(visit(node, index))))
    }

    fn try_walk<F, R, E>(&self, mut visit: F) -> Result<Flow, TraversalError<E>>
    where
        F: FnMut(&Node, usize) -> Result<R, E>,
        R: Into<Flow>,
    {
        walk_tree(self.as_node(), &mut |node: &Node, index: usize| {
            visit(node, index).map(Into::into)
        })
    }

    fn walk_decls<F, R>(&self, visit: F) -> Flow
    where
        F: FnMut(&Declaration, usize) -> R,
        R: Into<Flow>,
    {
        self.walk_decls_matching(Matcher::Any, visit)
    }

    /// Walk declarations whose `prop` matches `filter`
    fn walk_decls_matching<F, R>(&self, filter: impl Into<Matcher>, mut visit: F) -> Flow
    where
        F: FnMut(&Declaration, usize) -> R,
        R: Into<Flow>,
    {
        infallible(self.try_walk_decls(filter, |decl, index| {
            Ok::<R, Infallible>(visit(decl, index))
        }))
    }

    fn try_walk_decls<F, R, E>(
        &self,
        filter: impl Into<Matcher>,
        mut visit: F,
    ) -> Result<Flow, TraversalError<E>>
    where
        F: FnMut(&Declaration, usize) -> Result<R, E>,
        R: Into<Flow>,
    {
        walk_typed(
            self.as_node(),
            Node::as_decl,
            Declaration::prop,
            &filter.into(),
            &mut |decl: &Declaration, index: usize| visit(decl, index).map(Into::into),
        )
    }

    fn walk_rules<F, R>(&self, visit: F) -> Flow
    where
        F: FnMut(&Rule, usize) -> R,
        R: Into<Flow>,
    {
        self.walk_rules_matching(Matcher::Any, visit)
    }

    /// Walk rules whose `selector` matches `filter`
    fn walk_rules_matching<F, R>(&self, filter: impl Into<Matcher>, mut visit: F) -> Flow
    where
        F: FnMut(&Rule, usize) -> R,
        R: Into<Flow>,
    {
        infallible(self.try_walk_rules(filter, |rule, index| {
            Ok::<R, Infallible>(visit(rule, index))
        }))
    }

    fn try_walk_rules<F, R, E>(
        &self,
        filter: impl Into<Matcher>,
        mut visit: F,
    ) -> Result<Flow, TraversalError<E>>
    where
        F: FnMut(&Rule, usize) -> Result<R, E>,
        R: Into<Flow>,
    {
        walk_typed(
            self.as_node(),
            Node::as_rule,
            Rule::selector,
            &filter.into(),
            &mut |rule: &Rule, index: usize| visit(rule, index).map(Into::into),
        )
    }

    fn walk_at_rules<F, R>(&self, visit: F) -> Flow
    where
        F: FnMut(&AtRule, usize) -> R,
        R: Into<Flow>,
    {
        self.walk_at_rules_matching(Matcher::Any, visit)
    }

    /// Walk at-rules whose `name` matches `filter`
    fn walk_at_rules_matching<F, R>(&self, filter: impl Into<Matcher>, mut visit: F) -> Flow
    where
        F: FnMut(&AtRule, usize) -> R,
        R: Into<Flow>,
    {
        infallible(self.try_walk_at_rules(filter, |at_rule, index| {
            Ok::<R, Infallible>(visit(at_rule, index))
        }))
    }

    fn try_walk_at_rules<F, R, E>(
        &self,
        filter: impl Into<Matcher>,
        mut visit: F,
    ) -> Result<Flow, TraversalError<E>>
    where
        F: FnMut(&AtRule, usize) -> Result<R, E>,
        R: Into<Flow>,
    {
        walk_typed(
            self.as_node(),
            Node::as_at_rule,
            AtRule::name,
            &filter.into(),
            &mut |at_rule: &AtRule, index: usize| visit(at_rule, index).map(Into::into),
        )
    }

    fn walk_comments<F, R>(&self, mut visit: F) -> Flow
    where
        F: FnMut(&Comment, usize) -> R,
        R: Into<Flow>,
    {
        infallible(self.try_walk_comments(|comment, index| {
            Ok::<R, Infallible>(visit(comment, index))
        }))
    }

    fn try_walk_comments<F, R, E>(&self, mut visit: F) -> Result<Flow, TraversalError<E>>
    where
        F: FnMut(&Comment, usize) -> Result<R, E>,
        R: Into<Flow>,
    {
        walk_typed(
            self.as_node(),
            Node::as_comment,
            Comment::text,
            &Matcher::Any,
            &mut |comment: &Comment, index: usize| visit(comment, index).map(Into::into),
        )
    }

    /// Replace every match of `pattern` in declaration values below this
    /// container with `replacement`
    fn replace_values(
        &self,
        pattern: impl Into<ValuePattern>,
        options: &ReplaceOptions,
        replacement: &str,
    ) -> &Self {
        replace::replace_values(self.as_node(), &pattern.into(), options, &mut |_| {
            replacement.to_string()
        });
        self
    }

    /// Like [`Container::replace_values`], computing each replacement from
    /// the matched text
    fn replace_values_with(
        &self,
        pattern: impl Into<ValuePattern>,
        options: &ReplaceOptions,
        mut replacer: impl FnMut(&str) -> String,
    ) -> &Self {
        replace::replace_values(self.as_node(), &pattern.into(), options, &mut replacer);
        self
    }
}

impl Container for Rule {
    fn as_node(&self) -> &Node {
        self
    }
}

impl Container for AtRule {
    fn as_node(&self) -> &Node {
        self
    }
}

impl Container for Root {
    fn as_node(&self) -> &Node {
        self
    }
}

/// A container of any kind, as returned by [`Node::parent`]
#[derive(Clone, PartialEq, Eq)]
pub struct ContainerNode(Node);

impl ContainerNode {
    pub(crate) fn from_parent(node: Node) -> Self {
        ContainerNode(node)
    }

    pub fn into_node(self) -> Node {
        self.0
    }
}

impl Container for ContainerNode {
    fn as_node(&self) -> &Node {
        &self.0
    }
}

impl Deref for ContainerNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl From<ContainerNode> for Node {
    fn from(container: ContainerNode) -> Node {
        container.0
    }
}

macro_rules! container_from_handle {
    ($($handle:ty),*) => {
        $(
            impl From<$handle> for ContainerNode {
                fn from(handle: $handle) -> Self {
                    ContainerNode(handle.into())
                }
            }
        )*
    };
}

container_from_handle!(Rule, AtRule, Root);

impl From<ContainerNode> for Child {
    fn from(container: ContainerNode) -> Child {
        Child::Node(container.0)
    }
}

impl fmt::Debug for ContainerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ContainerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
