//! Recursive pre-order traversal built on `each`.

use crate::cursor::each_child;
use crate::error::TraversalError;
use crate::node::Node;
use regex::Regex;
use std::convert::Infallible;
use tracing::debug;

/// Outcome of a visit, and of a whole traversal.
///
/// A callback returning `false` (or `Flow::Stop`) ends the traversal; `()`
/// and `true` keep it going. A traversal that was stopped reports
/// `Flow::Stop`, one that ran to the end reports `Flow::Continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}

/// Second-stage filter of the typed walks
#[derive(Debug, Clone, Default)]
pub enum Matcher {
    #[default]
    Any,
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Exact(expected) => expected == candidate,
            Matcher::Pattern(pattern) => pattern.is_match(candidate),
        }
    }
}

impl From<&str> for Matcher {
    fn from(exact: &str) -> Self {
        Matcher::Exact(exact.to_string())
    }
}

impl From<String> for Matcher {
    fn from(exact: String) -> Self {
        Matcher::Exact(exact)
    }
}

impl From<Regex> for Matcher {
    fn from(pattern: Regex) -> Self {
        Matcher::Pattern(pattern)
    }
}

impl From<&Regex> for Matcher {
    fn from(pattern: &Regex) -> Self {
        Matcher::Pattern(pattern.clone())
    }
}

/// Visit every descendant of `container` in document order. Each child is
/// handed to `visit` before its own children are walked.
pub(crate) fn walk_tree<E>(
    container: &Node,
    visit: &mut dyn FnMut(&Node, usize) -> Result<Flow, E>,
) -> Result<Flow, TraversalError<E>> {
    each_child(container, &mut |child: &Node, index: usize| {
        let flow = visit(child, index).map_err(|error| {
            debug!(node = ?child, index, "traversal callback failed");
            TraversalError::new(error, child.clone())
        })?;
        if flow.is_stop() {
            return Ok(Flow::Stop);
        }
        if child.is_container() {
            walk_tree(child, &mut *visit)
        } else {
            Ok(Flow::Continue)
        }
    })
}

/// [`walk_tree`] restricted to one node variant, optionally filtered on the
/// variant's key (`prop`, `selector`, `name`).
pub(crate) fn walk_typed<H, E>(
    container: &Node,
    cast: fn(&Node) -> Option<H>,
    key: fn(&H) -> String,
    matcher: &Matcher,
    visit: &mut dyn FnMut(&H, usize) -> Result<Flow, E>,
) -> Result<Flow, TraversalError<E>> {
    walk_tree(container, &mut |node: &Node, index: usize| match cast(node) {
        Some(handle) if matcher.matches(&key(&handle)) => visit(&handle, index),
        _ => Ok(Flow::Continue),
    })
}

pub(crate) fn infallible<T>(result: Result<T, TraversalError<Infallible>>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => match error.into_inner() {},
    }
}
