use crate::error::{ParseError, ParseResult};
use logos::Logos;
use restyle_core::Location;
use std::ops::Range;

/// CSS tokens. Whitespace and comments are kept because they end up in raws.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum Token<'src> {
    #[regex(r"[ \t\r\n\f]+", |lex| lex.slice())]
    Space(&'src str),

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", |lex| lex.slice())]
    Comment(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r"'([^'\\]|\\.)*'", |lex| lex.slice())]
    String(&'src str),

    // At-rule names
    #[regex(r"@[a-zA-Z0-9_-]+", |lex| lex.slice())]
    AtWord(&'src str),

    #[token("{")]
    OpenCurly,

    #[token("}")]
    CloseCurly,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    // Selectors, properties, values: anything up to the next structural
    // character. `!` starts a new word so `red!important` splits.
    #[regex(r#"[^ \t\r\n\f{};:()"'/@!]+|![^ \t\r\n\f{};:()"'/@!]*"#, |lex| lex.slice())]
    Word(&'src str),

    #[token("/")]
    Slash,

    #[token("@")]
    At,
}

pub type Spanned<'src> = (Token<'src>, Range<usize>);

/// Tokenize CSS source into a vector of (token, span) pairs
pub fn tokenize(source: &str) -> ParseResult<Vec<Spanned<'_>>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            // A comment that never closes only matches its leading slash
            Ok(Token::Slash) if source[span.end..].starts_with('*') => {
                let at = LineIndex::new(source).location(span.start);
                return Err(ParseError::unclosed_comment(at));
            }
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let at = LineIndex::new(source).location(span.start);
                let rest = &source[span.start..];
                return Err(if rest.starts_with("/*") {
                    ParseError::unclosed_comment(at)
                } else if rest.starts_with('"') || rest.starts_with('\'') {
                    ParseError::unclosed_string(at)
                } else {
                    ParseError::unknown_word(at, &source[span])
                });
            }
        }
    }
    Ok(tokens)
}

/// Byte offset to 1-based line/column lookup
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    pub fn location(&self, offset: usize) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        Location::new(line + 1, column + 1)
    }
}
