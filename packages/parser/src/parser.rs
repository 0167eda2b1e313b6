use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, LineIndex, Spanned, Token};
use restyle_core::{
    AtRule, Comment, Container, ContainerNode, Declaration, Input, Location, Node, NodeKind, Root,
    Rule, Source,
};
use serde::Deserialize;
use std::mem;
use std::ops::Range;
use std::rc::Rc;
use tracing::{debug, instrument};

/// Options accepted by [`parse_with_options`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Path of the stylesheet, used in node sources and error frames
    pub from: Option<String>,
}

/// Parse CSS into a tree whose raws reproduce the input byte for byte
pub fn parse(source: &str) -> ParseResult<Root> {
    parse_with_options(source, &ParseOptions::default())
}

pub fn parse_with_path(source: &str, path: &str) -> ParseResult<Root> {
    let options = ParseOptions {
        from: Some(path.to_string()),
    };
    parse_with_options(source, &options)
}

#[instrument(skip(source), fields(len = source.len()))]
pub fn parse_with_options(source: &str, options: &ParseOptions) -> ParseResult<Root> {
    let root = Parser::new(source, options)?.parse()?;
    debug!(children = root.len(), "parsed stylesheet");
    Ok(root)
}

/// Builds a tree statement by statement.
///
/// Whitespace is collected into `spaces` until the next node claims it as its
/// `before` raw, or the enclosing block claims it as `after`.
pub struct Parser<'src> {
    source: &'src str,
    input: Rc<Input>,
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    lines: LineIndex<'src>,
    root: Root,
    current: ContainerNode,
    spaces: String,
    semicolon: bool,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, options: &ParseOptions) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        let input = Rc::new(Input::new(source, options.from.clone()));
        let lines = LineIndex::new(source);
        let root = Root::new().with_source(Source::new(input.clone(), lines.location(0)));
        Ok(Self {
            source,
            input,
            tokens,
            pos: 0,
            lines,
            current: root.clone().into(),
            root,
            spaces: String::new(),
            semicolon: false,
        })
    }

    pub fn parse(mut self) -> ParseResult<Root> {
        while let Some((token, span)) = self.advance() {
            match token {
                Token::Space(space) => self.spaces.push_str(space),
                // Stray semicolons are kept as whitespace
                Token::Semicolon => self.spaces.push(';'),
                Token::CloseCurly => self.end(span)?,
                Token::Comment(text) => self.comment(text, span),
                Token::AtWord(word) => self.at_rule(word, span)?,
                _ => self.other(self.pos - 1)?,
            }
        }
        self.end_file()?;
        Ok(self.root)
    }

    /// A declaration or a rule, decided by whichever of `;`, `{` or `}`
    /// comes first outside of parentheses
    fn other(&mut self, start: usize) -> ParseResult<()> {
        let mut colon = false;
        let mut brackets = Vec::new();
        let mut index = start;

        while let Some((token, _)) = self.tokens.get(index) {
            match token {
                Token::OpenParen => brackets.push(index),
                Token::CloseParen => {
                    brackets.pop();
                }
                _ if !brackets.is_empty() => {}
                Token::Semicolon => {
                    if !colon {
                        return Err(ParseError::missing_colon(self.location_of(start)));
                    }
                    self.pos = index + 1;
                    self.decl(start, index)?;
                    self.semicolon = true;
                    return Ok(());
                }
                Token::OpenCurly => {
                    self.pos = index + 1;
                    self.rule(start, index);
                    return Ok(());
                }
                Token::CloseCurly => break,
                Token::Colon => colon = true,
                _ => {}
            }
            index += 1;
        }

        if let Some(&open) = brackets.first() {
            return Err(ParseError::unclosed_bracket(self.location_of(open)));
        }
        if !colon {
            return Err(ParseError::missing_colon(self.location_of(start)));
        }

        // Whitespace and comments before `}` or the end of input belong to
        // the block, not to the value
        let mut end = index;
        while end > start + 1 && self.is_trivia(end - 1) {
            end -= 1;
        }
        self.pos = end;
        self.decl(start, end)
    }

    fn decl(&mut self, start: usize, end: usize) -> ParseResult<()> {
        let tokens = &self.tokens[start..end];

        let prop_len = tokens
            .iter()
            .take_while(|(token, _)| {
                !matches!(token, Token::Colon | Token::Space(_) | Token::Comment(_))
            })
            .count();
        if prop_len == 0 {
            let (_, span) = &tokens[0];
            return Err(ParseError::unknown_word(
                self.lines.location(span.start),
                &self.source[span.clone()],
            ));
        }

        let mut between_end = prop_len;
        while let Some((token, span)) = tokens.get(between_end) {
            between_end += 1;
            match token {
                Token::Colon => break,
                Token::Space(_) | Token::Comment(_) => {}
                _ => {
                    return Err(ParseError::unknown_word(
                        self.lines.location(span.start),
                        &self.source[span.clone()],
                    ))
                }
            }
        }

        let mut value_start = between_end;
        while value_start < tokens.len() && is_trivia(&tokens[value_start].0) {
            value_start += 1;
        }
        let mut value_end = tokens.len();
        let important = important_suffix(&tokens[value_start..]).map(|from| {
            value_end = value_start + from;
            self.text(&tokens[value_end..])
        });
        // A value made only of whitespace keeps it
        if value_start == value_end {
            value_start = between_end;
        }

        let mut prop = self.text(&tokens[..prop_len]);
        let mut before_hack = "";
        if prop.starts_with('*') || prop.starts_with('_') {
            before_hack = &prop[..1];
            prop = &prop[1..];
        }
        let between = self.text(&tokens[prop_len..value_start]);
        let value = self.text(&tokens[value_start..value_end]);
        let last_end = tokens[tokens.len() - 1].1.end;
        let start_offset = tokens[0].1.start;

        let decl = Declaration::new(prop, value).important(important.is_some());
        self.init(decl.clone().into_node(), start_offset);
        decl.update_raws(|raws| {
            if let Some(before) = raws.before.as_mut() {
                before.push_str(before_hack);
            }
            raws.between = Some(between.to_string());
            raws.important = important
                .filter(|suffix| *suffix != " !important")
                .map(str::to_string);
        });
        decl.set_source_end(self.lines.location(last_end.saturating_sub(1)));
        Ok(())
    }

    fn rule(&mut self, start: usize, open: usize) {
        let mut selector_end = open;
        while selector_end > start && self.is_trivia(selector_end - 1) {
            selector_end -= 1;
        }
        let selector = self.text(&self.tokens[start..selector_end]);
        let between = self.text(&self.tokens[selector_end..open]);
        let offset = self.tokens[start].1.start;

        let rule = Rule::new(selector);
        self.init(rule.clone().into_node(), offset);
        rule.update_raws(|raws| raws.between = Some(between.to_string()));
        self.current = rule.into();
    }

    fn at_rule(&mut self, word: &'src str, span: Range<usize>) -> ParseResult<()> {
        let name = &word[1..];
        let params_start = self.pos;
        let mut brackets = Vec::new();
        let mut open = false;
        let mut terminated_by_semicolon = false;

        while let Some((token, _)) = self.tokens.get(self.pos) {
            match token {
                Token::OpenParen => brackets.push(self.pos),
                Token::CloseParen => {
                    brackets.pop();
                }
                _ if !brackets.is_empty() => {}
                Token::Semicolon => {
                    terminated_by_semicolon = true;
                    break;
                }
                Token::OpenCurly => {
                    open = true;
                    break;
                }
                Token::CloseCurly => break,
                _ => {}
            }
            self.pos += 1;
        }
        if let Some(&bracket) = brackets.first() {
            return Err(ParseError::unclosed_bracket(self.location_of(bracket)));
        }
        let params_end = self.pos;
        if open || terminated_by_semicolon {
            self.pos += 1;
        }

        let mut after_name_end = params_start;
        while after_name_end < params_end && self.is_trivia(after_name_end) {
            after_name_end += 1;
        }
        let mut between_start = params_end;
        while between_start > after_name_end && self.is_trivia(between_start - 1) {
            between_start -= 1;
        }
        let after_name = self.text(&self.tokens[params_start..after_name_end]);
        let params = self.text(&self.tokens[after_name_end..between_start]);
        let between = self.text(&self.tokens[between_start..params_end]);
        let end_offset = if terminated_by_semicolon {
            self.tokens[params_end].1.start
        } else if between_start > params_start {
            self.tokens[between_start - 1].1.end - 1
        } else {
            span.end - 1
        };

        let at_rule = if open {
            AtRule::with_block(name, params)
        } else {
            AtRule::new(name, params)
        };
        self.init(at_rule.clone().into_node(), span.start);

        if open || terminated_by_semicolon {
            at_rule.update_raws(|raws| {
                raws.after_name = Some(after_name.to_string());
                raws.between = Some(between.to_string());
            });
        } else {
            // Trailing whitespace before `}` or the end of input goes to the block
            at_rule.update_raws(|raws| {
                raws.after_name = Some(after_name.to_string());
                raws.between = Some(String::new());
            });
            self.spaces = between.to_string();
        }

        if open {
            self.current = at_rule.into();
        } else {
            at_rule.set_source_end(self.lines.location(end_offset));
            self.semicolon = terminated_by_semicolon;
        }
        Ok(())
    }

    fn comment(&mut self, token: &'src str, span: Range<usize>) {
        let inner = &token[2..token.len() - 2];
        let (left, text, right) = if inner.trim().is_empty() {
            (inner, "", "")
        } else {
            let trimmed = inner.trim_start();
            let text = trimmed.trim_end();
            let left = &inner[..inner.len() - trimmed.len()];
            let right = &trimmed[text.len()..];
            (left, text, right)
        };

        let comment = Comment::new(text);
        self.init(comment.clone().into_node(), span.start);
        comment.update_raws(|raws| {
            raws.left = Some(left.to_string());
            raws.right = Some(right.to_string());
        });
        comment.set_source_end(self.lines.location(span.end.saturating_sub(1)));
    }

    fn init(&mut self, node: Node, offset: usize) {
        let before = mem::take(&mut self.spaces);
        node.update_raws(|raws| raws.before = Some(before));
        node.set_source(Some(Source::new(self.input.clone(), self.lines.location(offset))));
        if node.kind() != NodeKind::Comment {
            self.semicolon = false;
        }
        let pushed = self.current.push(node).is_ok();
        debug_assert!(pushed, "fresh node rejected by its block");
    }

    /// Close the current block at `}`
    fn end(&mut self, span: Range<usize>) -> ParseResult<()> {
        let at = self.lines.location(span.start);
        let parent = self
            .current
            .parent()
            .ok_or_else(|| ParseError::unexpected_close(at))?;
        self.close_current();
        self.current.set_source_end(at);
        self.current = parent;
        Ok(())
    }

    fn end_file(&mut self) -> ParseResult<()> {
        if self.current.parent().is_some() {
            let at = self
                .current
                .source()
                .map_or_else(|| self.lines.location(0), |source| source.start);
            return Err(ParseError::unclosed_block(at));
        }
        self.close_current();
        let end = self.source.len().saturating_sub(1);
        self.root.set_source_end(self.lines.location(end));
        Ok(())
    }

    fn close_current(&mut self) {
        let semicolon = mem::take(&mut self.semicolon);
        let spaces = mem::take(&mut self.spaces);
        let has_children = !self.current.is_empty();
        self.current.update_raws(|raws| {
            if has_children {
                raws.semicolon = Some(semicolon);
            }
            raws.after.get_or_insert_with(String::new).push_str(&spaces);
        });
    }

    fn advance(&mut self) -> Option<Spanned<'src>> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn is_trivia(&self, index: usize) -> bool {
        self.tokens
            .get(index)
            .is_some_and(|(token, _)| is_trivia(token))
    }

    fn location_of(&self, index: usize) -> Location {
        let offset = self.tokens.get(index).map_or(0, |(_, span)| span.start);
        self.lines.location(offset)
    }

    /// Source text covered by a run of consecutive tokens
    fn text(&self, tokens: &[Spanned<'src>]) -> &'src str {
        match (tokens.first(), tokens.last()) {
            (Some((_, first)), Some((_, last))) => &self.source[first.start..last.end],
            _ => "",
        }
    }
}

fn is_trivia(token: &Token) -> bool {
    matches!(token, Token::Space(_) | Token::Comment(_))
}

/// Index where a trailing `!important` (with its leading whitespace) starts
fn important_suffix(tokens: &[Spanned]) -> Option<usize> {
    let mut index = tokens.len();
    while index > 0 && is_trivia(&tokens[index - 1].0) {
        index -= 1;
    }
    let last = index.checked_sub(1)?;
    let mut start = match tokens[last].0 {
        Token::Word(word) if word.eq_ignore_ascii_case("!important") => last,
        Token::Word(word) if word.eq_ignore_ascii_case("important") => {
            let mut bang = last;
            while bang > 0 && is_trivia(&tokens[bang - 1].0) {
                bang -= 1;
            }
            match bang.checked_sub(1).map(|index| tokens[index].0) {
                Some(Token::Word("!")) => bang - 1,
                _ => return None,
            }
        }
        _ => return None,
    };
    while start > 0 && matches!(tokens[start - 1].0, Token::Space(_)) {
        start -= 1;
    }
    Some(start)
}
