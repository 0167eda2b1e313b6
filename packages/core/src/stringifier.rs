//! Rendering a tree back to CSS text.
//!
//! Raws present on a node are emitted verbatim. A missing raw is inferred from
//! the first node in the same tree that carries the same kind of raw, so
//! inserted nodes pick up the formatting style of the stylesheet around them.
//! When nothing can be inferred, [`RawDefaults`] supplies the fragment.

use crate::container::snapshot;
use crate::node::{Data, Node, NodeKind};
use crate::raws::{whitespace_only, Raws};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Formatting fragments used when a raw is absent and cannot be inferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDefaults {
    pub colon: String,
    pub indent: String,
    pub before_decl: String,
    pub before_rule: String,
    pub before_open: String,
    pub before_close: String,
    pub before_comment: String,
    pub after: String,
    pub empty_body: String,
    pub comment_left: String,
    pub comment_right: String,
    pub semicolon: bool,
}

impl Default for RawDefaults {
    fn default() -> Self {
        Self {
            colon: ": ".to_string(),
            indent: "    ".to_string(),
            before_decl: "\n".to_string(),
            before_rule: "\n".to_string(),
            before_open: " ".to_string(),
            before_close: "\n".to_string(),
            before_comment: "\n".to_string(),
            after: "\n".to_string(),
            empty_body: String::new(),
            comment_left: " ".to_string(),
            comment_right: " ".to_string(),
            semicolon: false,
        }
    }
}

impl RawDefaults {
    /// Load overrides; keys that are not given keep their default
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    fn get(&self, detect: Detect) -> String {
        match detect {
            Detect::Before => String::new(),
            Detect::After => self.after.clone(),
            Detect::BeforeDecl => self.before_decl.clone(),
            Detect::BeforeRule => self.before_rule.clone(),
            Detect::BeforeOpen => self.before_open.clone(),
            Detect::BeforeClose => self.before_close.clone(),
            Detect::BeforeComment => self.before_comment.clone(),
            Detect::Colon => self.colon.clone(),
            Detect::Indent => self.indent.clone(),
            Detect::EmptyBody => self.empty_body.clone(),
            Detect::CommentLeft => self.comment_left.clone(),
            Detect::CommentRight => self.comment_right.clone(),
        }
    }
}

/// Raw field read from the node itself before anything is inferred
#[derive(Debug, Clone, Copy)]
enum Own {
    Before,
    After,
    Between,
    Left,
    Right,
}

impl Own {
    fn get(self, raws: &Raws) -> Option<String> {
        match self {
            Own::Before => raws.before.clone(),
            Own::After => raws.after.clone(),
            Own::Between => raws.between.clone(),
            Own::Left => raws.left.clone(),
            Own::Right => raws.right.clone(),
        }
    }
}

/// What is being inferred when the node has no raw of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Detect {
    Before,
    After,
    BeforeDecl,
    BeforeRule,
    BeforeOpen,
    BeforeClose,
    BeforeComment,
    Colon,
    Indent,
    EmptyBody,
    CommentLeft,
    CommentRight,
}

/// Renders nodes to text. Inferred raws are cached for the duration of one
/// [`Stringifier::stringify`] call.
#[derive(Debug, Default)]
pub struct Stringifier {
    defaults: RawDefaults,
    cache: HashMap<Detect, String>,
    semicolon: Option<bool>,
}

impl Stringifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: RawDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    pub fn stringify(&mut self, node: &Node) -> String {
        self.cache.clear();
        self.semicolon = None;
        let mut out = String::new();
        self.node(node, false, &mut out);
        out
    }

    fn node(&mut self, node: &Node, semicolon: bool, out: &mut String) {
        let data = node.inner().data.clone();
        let raws = node.raws();
        match data {
            Data::Root => {
                self.body(node, out);
                if let Some(after) = raws.after {
                    out.push_str(&after);
                }
            }
            Data::Comment { text } => {
                let left = self.raw(node, Some(Own::Left), Detect::CommentLeft);
                let right = self.raw(node, Some(Own::Right), Detect::CommentRight);
                out.push_str("/*");
                out.push_str(&left);
                out.push_str(&text);
                out.push_str(&right);
                out.push_str("*/");
            }
            Data::Decl {
                prop,
                value,
                important,
            } => {
                let between = self.raw(node, Some(Own::Between), Detect::Colon);
                out.push_str(&prop);
                out.push_str(&between);
                out.push_str(&value);
                if important {
                    out.push_str(raws.important.as_deref().unwrap_or(" !important"));
                }
                if semicolon {
                    out.push(';');
                }
            }
            Data::Rule { selector } => self.block(node, &selector, out),
            Data::AtRule { name, params } => {
                let mut start = format!("@{name}");
                match raws.after_name {
                    Some(after_name) => start.push_str(&after_name),
                    None if !params.is_empty() => start.push(' '),
                    None => {}
                }
                start.push_str(&params);
                if node.has_block() {
                    self.block(node, &start, out);
                } else {
                    out.push_str(&start);
                    out.push_str(raws.between.as_deref().unwrap_or_default());
                    if semicolon {
                        out.push(';');
                    }
                }
            }
        }
    }

    fn block(&mut self, node: &Node, start: &str, out: &mut String) {
        let between = self.raw(node, Some(Own::Between), Detect::BeforeOpen);
        out.push_str(start);
        out.push_str(&between);
        out.push('{');
        let after = if snapshot(node).is_empty() {
            self.raw(node, Some(Own::After), Detect::EmptyBody)
        } else {
            self.body(node, out);
            self.raw(node, Some(Own::After), Detect::After)
        };
        out.push_str(&after);
        out.push('}');
    }

    fn body(&mut self, node: &Node, out: &mut String) {
        let children = snapshot(node);
        // Trailing comments do not take the final `;`
        let mut last = children.len().saturating_sub(1);
        while last > 0 && children[last].kind() == NodeKind::Comment {
            last -= 1;
        }
        let semicolon = self.raw_semicolon(node);
        for (index, child) in children.iter().enumerate() {
            let before = self.raw(child, Some(Own::Before), Detect::Before);
            out.push_str(&before);
            self.node(child, last != index || semicolon, out);
        }
    }

    fn raw(&mut self, node: &Node, own: Option<Own>, detect: Detect) -> String {
        if let Some(value) = own.and_then(|own| own.get(&node.inner().raws)) {
            return value;
        }
        let parent = node.parent_node();
        if detect == Detect::Before {
            match &parent {
                None => return String::new(),
                Some(parent)
                    if parent.kind() == NodeKind::Root
                        && snapshot(parent).first().is_some_and(|first| first.ptr_eq(node)) =>
                {
                    return String::new();
                }
                _ => {}
            }
        }
        if parent.is_none() {
            return self.defaults.get(detect);
        }
        if let Some(cached) = self.cache.get(&detect) {
            return cached.clone();
        }
        if matches!(detect, Detect::Before | Detect::After) {
            return self.before_after(node, detect);
        }

        let root = node.root();
        let inferred = match detect {
            Detect::BeforeDecl => Some(self.infer_before_decl(&root, node)),
            Detect::BeforeRule => infer_before_rule(&root),
            Detect::BeforeOpen => infer_before_open(&root),
            Detect::BeforeClose => infer_before_close(&root),
            Detect::BeforeComment => Some(self.infer_before_comment(&root, node)),
            Detect::Colon => infer_colon(&root),
            Detect::Indent => infer_indent(&root),
            Detect::EmptyBody => infer_empty_body(&root),
            Detect::CommentLeft => first_in_tree(&root, &mut |n| n.inner().raws.left.clone()),
            Detect::CommentRight => first_in_tree(&root, &mut |n| n.inner().raws.right.clone()),
            Detect::Before | Detect::After => None,
        };
        let value = inferred.unwrap_or_else(|| self.defaults.get(detect));
        self.cache.insert(detect, value.clone());
        value
    }

    /// Leading or trailing whitespace of a node, indented to its depth
    fn before_after(&mut self, node: &Node, detect: Detect) -> String {
        let mut value = match node.kind() {
            NodeKind::Decl => self.raw(node, None, Detect::BeforeDecl),
            NodeKind::Comment => self.raw(node, None, Detect::BeforeComment),
            _ if detect == Detect::Before => self.raw(node, None, Detect::BeforeRule),
            _ => self.raw(node, None, Detect::BeforeClose),
        };

        let mut depth = 0;
        let mut ancestor = node.parent_node();
        while let Some(current) = ancestor {
            if current.kind() == NodeKind::Root {
                break;
            }
            depth += 1;
            ancestor = current.parent_node();
        }

        if value.contains('\n') {
            let indent = self.raw(node, None, Detect::Indent);
            for _ in 0..depth {
                value.push_str(&indent);
            }
        }
        value
    }

    fn raw_semicolon(&mut self, node: &Node) -> bool {
        if let Some(own) = node.inner().raws.semicolon {
            return own;
        }
        if node.parent_node().is_none() {
            return self.defaults.semicolon;
        }
        if let Some(cached) = self.semicolon {
            return cached;
        }
        let inferred = first_in_tree(&node.root(), &mut |candidate| {
            let ends_with_decl = snapshot(candidate)
                .last()
                .is_some_and(|last| last.kind() == NodeKind::Decl);
            if ends_with_decl {
                candidate.inner().raws.semicolon
            } else {
                None
            }
        })
        .unwrap_or(self.defaults.semicolon);
        self.semicolon = Some(inferred);
        inferred
    }

    fn infer_before_decl(&mut self, root: &Node, node: &Node) -> String {
        let found = first_in_tree(root, &mut |candidate| {
            if candidate.kind() == NodeKind::Decl {
                candidate.inner().raws.before.as_deref().map(strip_last_line)
            } else {
                None
            }
        });
        match found {
            Some(value) => whitespace_only(&value),
            None => self.raw(node, None, Detect::BeforeRule),
        }
    }

    fn infer_before_comment(&mut self, root: &Node, node: &Node) -> String {
        let found = first_in_tree(root, &mut |candidate| {
            if candidate.kind() == NodeKind::Comment {
                candidate.inner().raws.before.as_deref().map(strip_last_line)
            } else {
                None
            }
        });
        match found {
            Some(value) => whitespace_only(&value),
            None => self.raw(node, None, Detect::BeforeDecl),
        }
    }
}

/// Pre-order search below `container`, returning the first hit of `probe`
fn first_in_tree<T>(container: &Node, probe: &mut dyn FnMut(&Node) -> Option<T>) -> Option<T> {
    for child in snapshot(container) {
        if let Some(found) = probe(&child) {
            return Some(found);
        }
        if child.has_block() {
            if let Some(found) = first_in_tree(&child, probe) {
                return Some(found);
            }
        }
    }
    None
}

/// Drop whatever follows the last line break, i.e. the indentation that
/// belongs to the sampled node's own depth
fn strip_last_line(value: &str) -> String {
    match value.rfind('\n') {
        Some(position) => value[..=position].to_string(),
        None => value.to_string(),
    }
}

fn infer_before_rule(root: &Node) -> Option<String> {
    let first = snapshot(root).first().cloned();
    first_in_tree(root, &mut |candidate| {
        let is_root_first = first.as_ref().is_some_and(|first| first.ptr_eq(candidate));
        if candidate.has_block() && !is_root_first {
            candidate.inner().raws.before.as_deref().map(strip_last_line)
        } else {
            None
        }
    })
    .map(|value| whitespace_only(&value))
}

fn infer_before_close(root: &Node) -> Option<String> {
    first_in_tree(root, &mut |candidate| {
        if candidate.has_block() && !snapshot(candidate).is_empty() {
            candidate.inner().raws.after.as_deref().map(strip_last_line)
        } else {
            None
        }
    })
    .map(|value| whitespace_only(&value))
}

fn infer_before_open(root: &Node) -> Option<String> {
    first_in_tree(root, &mut |candidate| {
        if candidate.kind() == NodeKind::Decl {
            None
        } else {
            candidate.inner().raws.between.clone()
        }
    })
}

fn infer_colon(root: &Node) -> Option<String> {
    first_in_tree(root, &mut |candidate| {
        if candidate.kind() != NodeKind::Decl {
            return None;
        }
        candidate
            .inner()
            .raws
            .between
            .as_deref()
            .map(|between| between.chars().filter(|c| c.is_whitespace() || *c == ':').collect())
    })
}

fn infer_empty_body(root: &Node) -> Option<String> {
    first_in_tree(root, &mut |candidate| {
        if candidate.has_block() && snapshot(candidate).is_empty() {
            candidate.inner().raws.after.clone()
        } else {
            None
        }
    })
}

/// Indentation unit: the root's own `indent` raw, else the leading whitespace
/// of the first node nested two levels deep
fn infer_indent(root: &Node) -> Option<String> {
    if let Some(indent) = root.inner().raws.indent.clone().filter(|i| !i.is_empty()) {
        return Some(indent);
    }
    first_in_tree(root, &mut |candidate| {
        let parent = candidate.parent_node()?;
        let grandparent = parent.parent_node()?;
        if parent.ptr_eq(root) || !grandparent.ptr_eq(root) {
            return None;
        }
        let before = candidate.inner().raws.before.clone()?;
        let last_line = before.rsplit('\n').next().unwrap_or_default();
        Some(whitespace_only(last_line))
    })
}
