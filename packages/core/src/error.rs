use crate::node::Node;
use std::error::Error;
use std::fmt;
use thiserror::Error;

pub type NodeResult<T> = Result<T, NodeError>;

/// Structural failures of the mutation API. Every operation returning one
/// of these leaves the tree untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Value field is missed in node creation")]
    MissingValue,

    #[error("Unknown node type in node creation")]
    UnknownNodeType,

    #[error("Node is not a child of this container")]
    NotAChild,

    #[error("Index {index} is out of bounds for a container with {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot insert a node into itself or one of its descendants")]
    CyclicInsert,
}

/// An error raised by a traversal callback, tagged with the node that was
/// being visited.
///
/// The callback's own error is kept as-is and stays reachable through
/// [`TraversalError::error`], [`TraversalError::into_inner`] and
/// [`Error::source`].
pub struct TraversalError<E> {
    error: E,
    node: Node,
}

impl<E> TraversalError<E> {
    pub(crate) fn new(error: E, node: Node) -> Self {
        Self { error, node }
    }

    pub fn error(&self) -> &E {
        &self.error
    }

    pub fn into_inner(self) -> E {
        self.error
    }

    /// Node the callback was visiting when it failed
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// `file:line:column` of the failing node, if it came from a parsed file
    pub fn frame(&self) -> Option<String> {
        let source = self.node.source()?;
        Some(format!("{}:{}", source.input.name(), source.start))
    }
}

impl<E: fmt::Debug> fmt::Debug for TraversalError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalError")
            .field("error", &self.error)
            .field("node", &self.node)
            .finish()
    }
}

impl<E: fmt::Display> fmt::Display for TraversalError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(frame) = self.frame() {
            write!(f, "\n    at {frame}")?;
        }
        Ok(())
    }
}

impl<E: Error + 'static> Error for TraversalError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}
