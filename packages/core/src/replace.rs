//! Bulk rewriting of declaration values.

use crate::node::{Declaration, Node};
use crate::walk::{infallible, walk_typed, Flow, Matcher};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::trace;

/// What to look for in declaration values
#[derive(Debug, Clone)]
pub enum ValuePattern {
    /// Every occurrence of the literal text
    Literal(String),
    Pattern(Regex),
}

impl ValuePattern {
    fn replace(&self, value: &str, replacer: &mut dyn FnMut(&str) -> String) -> Option<String> {
        match self {
            ValuePattern::Literal(needle) => {
                if needle.is_empty() || !value.contains(needle.as_str()) {
                    return None;
                }
                let mut out = String::with_capacity(value.len());
                let mut last = 0;
                for (start, matched) in value.match_indices(needle.as_str()) {
                    out.push_str(&value[last..start]);
                    out.push_str(&replacer(matched));
                    last = start + matched.len();
                }
                out.push_str(&value[last..]);
                Some(out)
            }
            ValuePattern::Pattern(pattern) => {
                if !pattern.is_match(value) {
                    return None;
                }
                Some(
                    pattern
                        .replace_all(value, |caps: &Captures| replacer(&caps[0]))
                        .into_owned(),
                )
            }
        }
    }
}

impl From<&str> for ValuePattern {
    fn from(needle: &str) -> Self {
        ValuePattern::Literal(needle.to_string())
    }
}

impl From<String> for ValuePattern {
    fn from(needle: String) -> Self {
        ValuePattern::Literal(needle)
    }
}

impl From<Regex> for ValuePattern {
    fn from(pattern: Regex) -> Self {
        ValuePattern::Pattern(pattern)
    }
}

impl From<&Regex> for ValuePattern {
    fn from(pattern: &Regex) -> Self {
        ValuePattern::Pattern(pattern.clone())
    }
}

/// Narrows which declarations `replace_values` touches
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplaceOptions {
    /// Only declarations with one of these property names
    pub props: Option<Vec<String>>,
    /// Substring a value must contain before the pattern is tried at all
    pub fast: Option<String>,
}

impl ReplaceOptions {
    pub fn props<I, S>(props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            props: Some(props.into_iter().map(Into::into).collect()),
            fast: None,
        }
    }

    pub fn fast(needle: impl Into<String>) -> Self {
        Self {
            props: None,
            fast: Some(needle.into()),
        }
    }

    fn admits(&self, prop: &str, value: &str) -> bool {
        if let Some(props) = &self.props {
            if !props.iter().any(|candidate| candidate == prop) {
                return false;
            }
        }
        match &self.fast {
            Some(needle) => value.contains(needle.as_str()),
            None => true,
        }
    }
}

pub(crate) fn replace_values(
    container: &Node,
    pattern: &ValuePattern,
    options: &ReplaceOptions,
    replacer: &mut dyn FnMut(&str) -> String,
) {
    let mut rewritten = 0usize;
    infallible(walk_typed(
        container,
        Node::as_decl,
        Declaration::prop,
        &Matcher::Any,
        &mut |decl: &Declaration, _index: usize| {
            let value = decl.value();
            if options.admits(&decl.prop(), &value) {
                if let Some(replaced) = pattern.replace(&value, replacer) {
                    decl.set_value(replaced);
                    rewritten += 1;
                }
            }
            Ok::<Flow, Infallible>(Flow::Continue)
        },
    ));
    trace!(container = ?container, rewritten, "replaced declaration values");
}
