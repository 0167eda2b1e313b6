pub mod container;
mod cursor;
pub mod error;
pub mod node;
pub mod props;
pub mod raws;
pub mod replace;
pub mod stringifier;
pub mod walk;


#[cfg(test)]
mod tests_mutation;


pub use container::{Container, ContainerNode, Position};
pub use error::{NodeError, NodeResult, TraversalError};
pub use node::{AtRule, Comment, Declaration, Input, Location, Node, NodeKind, Root, Rule, Source};
pub use props::{Child, NodeProps};
pub use raws::Raws;
pub use replace::{ReplaceOptions, ValuePattern};
pub use stringifier::{RawDefaults, Stringifier};
pub use walk::{Flow, Matcher};
