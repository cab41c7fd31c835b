use std::iter::FusedIterator;

use crate::{
    span::{Cursor, Span},
    token::Token,
    ErrorKind, LalrError, LalrResult,
};

use super::{Lexer, StateChange};

/// The tokens of one input, produced on demand.
///
/// Single pass: once exhausted, or after an error, the stream only yields
/// `None`.
pub struct LexerStream<'lexer, 'input> {
    lexer: &'lexer Lexer,
    input: &'input str,
    cursor: Cursor,
    /// Lexical states, the current one on top.
    stack: Vec<usize>,
    done: bool,
}

impl<'lexer, 'input> LexerStream<'lexer, 'input> {
    pub(super) fn new(lexer: &'lexer Lexer, input: &'input str) -> Self {
        Self {
            lexer,
            input,
            cursor: Cursor::default(),
            stack: vec![0],
            done: false,
        }
    }

    /// Depth of the lexical state stack, 1 in the initial state.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Name of the current lexical state.
    pub fn state(&self) -> &'lexer str {
        let lexer = self.lexer;
        &lexer.states[self.current()].name
    }

    /// Position of the next character to read.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn current(&self) -> usize {
        self.stack.last().copied().unwrap_or_default()
    }

    fn fail(&mut self, kind: ErrorKind, span: Span) -> Option<LalrResult<Token>> {
        self.done = true;
        Some(Err(LalrError::new(kind, Some(span))))
    }
}

impl Iterator for LexerStream<'_, '_> {
    type Item = LalrResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        let lexer = self.lexer;
        let input = self.input;

        while !self.done {
            let rest = &input[self.cursor.offset..];
            let Some(ch) = rest.chars().next() else {
                self.done = true;
                break;
            };

            let state = &lexer.states[self.current()];
            let Some((rule, len)) = state
                .rules
                .iter()
                .find_map(|rule| rule.matches(rest).map(|len| (rule, len)))
            else {
                return self.fail(ErrorKind::UnmatchedCharacter { ch }, Span::from(self.cursor));
            };

            let text = &rest[..len];
            let span = Span::covering(self.cursor, text);
            self.cursor += text;

            let Some(name) = &rule.name else {
                continue;
            };

            match rule.transition {
                Some(StateChange::Push(target)) => {
                    log::trace!("lexer: {} pushes state {}", name, lexer.states[target].name);
                    self.stack.push(target);
                }
                Some(StateChange::Pop) if self.stack.len() == 1 => {
                    return self.fail(ErrorKind::EmptyStateStack, span);
                }
                Some(StateChange::Pop) => {
                    self.stack.pop();
                    log::trace!("lexer: {} returns to state {}", name, self.state());
                }
                None => {}
            }

            return Some(Ok(Token::new(name, text).with_span(span)));
        }

        None
    }
}

impl FusedIterator for LexerStream<'_, '_> {}
