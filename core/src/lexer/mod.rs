use std::collections::HashMap;

use regex::Regex;

use crate::{token::Token, ErrorKind, LalrError, LalrResult};

mod stream;

pub use stream::LexerStream;

/// Name of the state a lexer starts in.
pub const INITIAL_STATE: &str = "<initial>";

/// Lexical state change performed after a rule matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Enter the named state, on top of the current one.
    Push(String),
    /// Return to the state below the current one.
    Pop,
}

impl Transition {
    pub fn push(target: impl ToString) -> Self {
        Self::Push(target.to_string())
    }
}

#[derive(Debug, Clone)]
struct RuleDecl {
    /// `None` for ignore patterns.
    name: Option<String>,
    pattern: String,
    transition: Option<Transition>,
}

/// The rules of one lexical state, tried in declaration order.
#[derive(Debug, Clone, Default)]
pub struct LexerState {
    rules: Vec<RuleDecl>,
}

impl LexerState {
    pub fn add(&mut self, name: impl ToString, pattern: impl ToString) -> &mut Self {
        self.push(Some(name.to_string()), pattern, None)
    }

    pub fn add_with_transition(
        &mut self,
        name: impl ToString,
        pattern: impl ToString,
        transition: Transition,
    ) -> &mut Self {
        self.push(Some(name.to_string()), pattern, Some(transition))
    }

    /// Skips text matching the pattern without producing a token.
    pub fn ignore(&mut self, pattern: impl ToString) -> &mut Self {
        self.push(None, pattern, None)
    }

    fn push(
        &mut self,
        name: Option<String>,
        pattern: impl ToString,
        transition: Option<Transition>,
    ) -> &mut Self {
        self.rules.push(RuleDecl {
            name,
            pattern: pattern.to_string(),
            transition,
        });
        self
    }
}

/// Declares the lexical states and their rules.
///
/// Rules added directly on the generator belong to the initial state.
///
/// # Example
/// ```
/// use lalrgen_core::{LexerGenerator, Token};
///
/// let mut lg = LexerGenerator::new();
/// lg.add("NUMBER", r"\d+").add("PLUS", r"\+").ignore(r"\s+");
///
/// let lexer = lg.build().unwrap();
/// let tokens = lexer.tokenize("1 + 2").unwrap();
///
/// assert_eq!(tokens[1], Token::new("PLUS", "+"));
/// ```
#[derive(Debug, Clone)]
pub struct LexerGenerator {
    states: Vec<(String, LexerState)>,
}

impl Default for LexerGenerator {
    fn default() -> Self {
        Self {
            states: vec![(INITIAL_STATE.to_string(), LexerState::default())],
        }
    }
}

impl LexerGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl ToString, pattern: impl ToString) -> &mut Self {
        self.initial().add(name, pattern);
        self
    }

    pub fn add_with_transition(
        &mut self,
        name: impl ToString,
        pattern: impl ToString,
        transition: Transition,
    ) -> &mut Self {
        self.initial().add_with_transition(name, pattern, transition);
        self
    }

    pub fn ignore(&mut self, pattern: impl ToString) -> &mut Self {
        self.initial().ignore(pattern);
        self
    }

    /// Returns the named state, creating it if needed.
    pub fn add_state(&mut self, name: &str) -> &mut LexerState {
        let id = match self.states.iter().position(|(id, _)| id == name) {
            Some(id) => id,
            None => {
                self.states.push((name.to_string(), LexerState::default()));
                self.states.len() - 1
            }
        };

        &mut self.states[id].1
    }

    fn initial(&mut self) -> &mut LexerState {
        &mut self.states[0].1
    }

    /// Compiles every pattern.
    ///
    /// Fails on the first pattern the regex engine rejects, or on a push
    /// towards an undeclared state.
    pub fn build(&self) -> LalrResult<Lexer> {
        let index: HashMap<String, usize> = self
            .states
            .iter()
            .enumerate()
            .map(|(id, (name, _))| (name.clone(), id))
            .collect();

        let states = self
            .states
            .iter()
            .map(|(name, state)| {
                let rules = state
                    .rules
                    .iter()
                    .map(|decl| Rule::compile(decl, &index))
                    .collect::<LalrResult<Vec<_>>>()?;

                Ok(CompiledState {
                    name: name.clone(),
                    rules,
                })
            })
            .collect::<LalrResult<Vec<_>>>()?;

        log::debug!(
            "lexer: {} states, {} rules",
            states.len(),
            states.iter().map(|state| state.rules.len()).sum::<usize>()
        );

        Ok(Lexer { states })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateChange {
    Push(usize),
    Pop,
}

#[derive(Debug)]
struct Rule {
    name: Option<String>,
    regex: Regex,
    transition: Option<StateChange>,
}

impl Rule {
    fn compile(decl: &RuleDecl, states: &HashMap<String, usize>) -> LalrResult<Self> {
        // Anchored at the beginning of the remaining input.
        let regex = Regex::new(&format!("^(?:{})", decl.pattern))
            .map_err(|err| LalrError::from(ErrorKind::invalid_pattern(&decl.pattern, err)))?;

        let transition = match &decl.transition {
            None => None,
            Some(Transition::Pop) => Some(StateChange::Pop),
            Some(Transition::Push(target)) => Some(StateChange::Push(
                states
                    .get(target)
                    .copied()
                    .ok_or_else(|| LalrError::from(ErrorKind::UnknownLexerState(target.clone())))?,
            )),
        };

        Ok(Self {
            name: decl.name.clone(),
            regex,
            transition,
        })
    }

    /// Length of the non-empty match at the start of `input`.
    fn matches(&self, input: &str) -> Option<usize> {
        self.regex
            .find(input)
            .map(|m| m.end())
            .filter(|&len| len > 0)
    }
}

#[derive(Debug)]
struct CompiledState {
    name: String,
    rules: Vec<Rule>,
}

/// A compiled lexer.
///
/// Immutable, the position and the state stack belong to each
/// [`LexerStream`].
#[derive(Debug)]
pub struct Lexer {
    states: Vec<CompiledState>,
}

impl Lexer {
    /// Lazily splits `input` into tokens.
    pub fn lex<'lexer, 'input>(&'lexer self, input: &'input str) -> LexerStream<'lexer, 'input> {
        LexerStream::new(self, input)
    }

    /// Collects all tokens of `input`, stopping at the first error.
    pub fn tokenize(&self, input: &str) -> LalrResult<Vec<Token>> {
        self.lex(input).collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use crate::{span::Cursor, token::Token, ErrorKind};

    use super::{Lexer, LexerGenerator, Transition};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn arith() -> Lexer {
        let mut lg = LexerGenerator::new();
        lg.add("NUMBER", r"\d+").add("PLUS", r"\+").ignore(r"\s+");
        lg.build().unwrap()
    }

    fn nested_comments() -> Lexer {
        let mut lg = LexerGenerator::new();
        lg.add("NUMBER", r"\d+")
            .add("ADD", r"\+")
            .add_with_transition("COMMENT_START", r"\(#", Transition::push("comment"))
            .ignore(r"\s+");

        lg.add_state("comment")
            .add_with_transition("COMMENT_START", r"\(#", Transition::push("comment"))
            .add_with_transition("COMMENT_END", r"#\)", Transition::Pop)
            .add("COMMENT", r"([^(#]|#+[^()#]|\(+[^(#])+|[(#]");

        lg.build().unwrap()
    }

    #[test]
    fn test_basic_lexer() {
        init();
        let lexer = arith();
        let mut stream = lexer.lex("14+14+14");

        for expected in [
            Token::new("NUMBER", "14"),
            Token::new("PLUS", "+"),
            Token::new("NUMBER", "14"),
            Token::new("PLUS", "+"),
            Token::new("NUMBER", "14"),
        ] {
            assert_eq!(stream.next().unwrap().unwrap(), expected);
        }

        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_rules_are_tried_in_declaration_order() {
        let mut lg = LexerGenerator::new();
        lg.add("IF", "if").add("IDENT", "[a-z]+");
        let lexer = lg.build().unwrap();

        assert_eq!(
            lexer.tokenize("iffy").unwrap(),
            vec![Token::new("IF", "if"), Token::new("IDENT", "fy")]
        );
    }

    #[test]
    fn test_token_spans() {
        let tokens = arith().tokenize("1\n + 23").unwrap();

        let plus = tokens[1].span().unwrap();
        assert_eq!(plus.from, Cursor::new(3, 2, 2));

        let number = tokens[2].span().unwrap();
        assert_eq!(number.from, Cursor::new(5, 2, 4));
        assert_eq!(number.to, Cursor::new(6, 2, 5));
    }

    #[test]
    fn test_unmatched_character() {
        let lexer = arith();
        let mut stream = lexer.lex("1 $ 2");

        assert_eq!(stream.next().unwrap().unwrap(), Token::new("NUMBER", "1"));

        let err = stream.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnmatchedCharacter { ch: '$' });
        assert_eq!(err.span().unwrap().from, Cursor::new(2, 1, 3));

        assert!(stream.next().is_none());
    }

    #[test]
    fn test_zero_length_match_is_not_a_match() {
        let mut lg = LexerGenerator::new();
        lg.add("AS", "a*");
        let lexer = lg.build().unwrap();

        let err = lexer.tokenize("b").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnmatchedCharacter { ch: 'b' });
    }

    #[test]
    fn test_nested_comments() {
        init();
        let lexer = nested_comments();

        let tokens = lexer
            .tokenize("(# this is (# a nested comment #)#) 1 + 1 (# 1 # 1 #)")
            .unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::new("COMMENT_START", "(#"),
                Token::new("COMMENT", " this is "),
                Token::new("COMMENT_START", "(#"),
                Token::new("COMMENT", " a nested comment "),
                Token::new("COMMENT_END", "#)"),
                Token::new("COMMENT_END", "#)"),
                Token::new("NUMBER", "1"),
                Token::new("ADD", "+"),
                Token::new("NUMBER", "1"),
                Token::new("COMMENT_START", "(#"),
                Token::new("COMMENT", " 1 # 1 "),
                Token::new("COMMENT_END", "#)"),
            ]
        );
    }

    #[test]
    fn test_comment_delimiters_after_runs() {
        let lexer = nested_comments();

        let tokens = lexer.tokenize("(# a ##) (# ((# b #)#)").unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::new("COMMENT_START", "(#"),
                Token::new("COMMENT", " a "),
                Token::new("COMMENT", "#"),
                Token::new("COMMENT_END", "#)"),
                Token::new("COMMENT_START", "(#"),
                Token::new("COMMENT", " "),
                Token::new("COMMENT", "("),
                Token::new("COMMENT_START", "(#"),
                Token::new("COMMENT", " b "),
                Token::new("COMMENT_END", "#)"),
                Token::new("COMMENT_END", "#)"),
            ]
        );
    }

    #[test]
    fn test_state_stack_depth() {
        let lexer = nested_comments();
        let mut stream = lexer.lex("(# (# #) #) 1");

        let depths: Vec<_> = std::iter::from_fn(|| {
            let token = stream.next()?.unwrap();
            Some((token.name, stream.depth()))
        })
        .filter(|(name, _)| name != "COMMENT")
        .map(|(_, depth)| depth)
        .collect();

        assert_eq!(depths, vec![2, 3, 2, 1, 1]);
        assert_eq!(stream.state(), super::INITIAL_STATE);
    }

    #[test]
    fn test_unbalanced_pop() {
        let mut lg = LexerGenerator::new();
        lg.add_with_transition("CLOSE", r"\)", Transition::Pop);
        let lexer = lg.build().unwrap();

        let err = lexer.tokenize(")").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EmptyStateStack);
    }

    #[rstest]
    #[case("(", "NUMBER")]
    #[case("[a-", "NUMBER")]
    fn test_invalid_pattern(#[case] pattern: &str, #[case] name: &str) {
        let mut lg = LexerGenerator::new();
        lg.add(name, pattern);

        let err = lg.build().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidPattern { pattern: p, .. } if p == pattern
        ));
    }

    #[test]
    fn test_push_to_unknown_state() {
        let mut lg = LexerGenerator::new();
        lg.add_with_transition("OPEN", r"\(", Transition::push("string"));

        let err = lg.build().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownLexerState("string".into()));
    }

    #[test]
    fn test_add_state_returns_the_existing_state() {
        let mut lg = LexerGenerator::new();
        lg.add_state("comment").add("A", "a");
        lg.add_state("comment").add("B", "b");
        lg.add_with_transition("OPEN", r"\(", Transition::push("comment"));

        let lexer = lg.build().unwrap();
        assert_eq!(
            lexer.tokenize("(ab").unwrap(),
            vec![
                Token::new("OPEN", "("),
                Token::new("A", "a"),
                Token::new("B", "b"),
            ]
        );
    }

    fn lexeme() -> impl Strategy<Value = String> {
        prop_oneof![
            "[0-9]{1,4}",
            Just("+".to_string()),
            "[ \t\n]{1,3}",
        ]
    }

    proptest! {
        #[test]
        fn test_lexing_is_lossless(lexemes in prop::collection::vec(lexeme(), 0..24)) {
            let input: String = lexemes.concat();
            let tokens = arith().tokenize(&input).unwrap();

            let kept: String = input.chars().filter(|ch| !ch.is_whitespace()).collect();
            prop_assert_eq!(tokens.iter().map(Token::value).collect::<String>(), kept);

            for token in tokens.iter() {
                let offset = token.span().unwrap().from.offset;
                prop_assert_eq!(&input[offset..offset + token.value.len()], token.value());
            }
        }
    }
}
