use restyle_core::Location;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unclosed block at {line}:{column}")]
    UnclosedBlock { line: usize, column: usize },

    #[error("Unexpected }} at {line}:{column}")]
    UnexpectedClose { line: usize, column: usize },

    #[error("Unclosed comment at {line}:{column}")]
    UnclosedComment { line: usize, column: usize },

    #[error("Unclosed string at {line}:{column}")]
    UnclosedString { line: usize, column: usize },

    #[error("Unclosed bracket at {line}:{column}")]
    UnclosedBracket { line: usize, column: usize },

    #[error("Missed semicolon or colon at {line}:{column}")]
    MissingColon { line: usize, column: usize },

    #[error("Unknown word {word} at {line}:{column}")]
    UnknownWord {
        word: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn unclosed_block(at: Location) -> Self {
        Self::UnclosedBlock {
            line: at.line,
            column: at.column,
        }
    }

    pub fn unexpected_close(at: Location) -> Self {
        Self::UnexpectedClose {
            line: at.line,
            column: at.column,
        }
    }

    pub fn unclosed_comment(at: Location) -> Self {
        Self::UnclosedComment {
            line: at.line,
            column: at.column,
        }
    }

    pub fn unclosed_string(at: Location) -> Self {
        Self::UnclosedString {
            line: at.line,
            column: at.column,
        }
    }

    pub fn unclosed_bracket(at: Location) -> Self {
        Self::UnclosedBracket {
            line: at.line,
            column: at.column,
        }
    }

    pub fn missing_colon(at: Location) -> Self {
        Self::MissingColon {
            line: at.line,
            column: at.column,
        }
    }

    pub fn unknown_word(at: Location, word: impl Into<String>) -> Self {
        Self::UnknownWord {
            word: word.into(),
            line: at.line,
            column: at.column,
        }
    }

    /// Where in the input the error was raised
    pub fn location(&self) -> Location {
        match self {
            Self::UnclosedBlock { line, column }
            | Self::UnexpectedClose { line, column }
            | Self::UnclosedComment { line, column }
            | Self::UnclosedString { line, column }
            | Self::UnclosedBracket { line, column }
            | Self::MissingColon { line, column }
            | Self::UnknownWord { line, column, .. } => Location::new(*line, *column),
        }
    }
}
