use itertools::Itertools as _;
use thiserror::Error;

use crate::{lr::StateId, rule::ProductionId, span::Span, token::Token};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedSymbols(pub Vec<String>);

impl std::fmt::Display for ExpectedSymbols {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(", "))
    }
}

impl<S: ToString> FromIterator<S> for ExpectedSymbols {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(|s| s.to_string()).sorted().collect())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unmatched character {ch:?}")]
    UnmatchedCharacter { ch: char },

    #[error("cannot pop the lexer state stack below its initial state")]
    EmptyStateStack,

    #[error("unknown lexer state {0}")]
    UnknownLexerState(String),

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid rule {0:?}, expecting \"LHS : SYM ...\"")]
    InvalidRule(String),

    #[error("illegal rule name {0}, already defined as a token")]
    RuleNameIsTerminal(String),

    #[error("a token with the same name already exists {0}")]
    DuplicateTerminal(String),

    #[error("symbol {symbol} used in production {production}, but not defined as a token or a rule")]
    UndefinedSymbol { symbol: String, production: String },

    #[error("precedence declared for unknown token {0}")]
    UnknownPrecedenceTerminal(String),

    #[error("precedence already specified for {0}")]
    DuplicatePrecedence(String),

    #[error("nothing known about the precedence of {precedence} in production {production}")]
    UnknownPrecedence {
        precedence: String,
        production: String,
    },

    #[error("the grammar has no productions")]
    NoProductions,

    #[error("the start symbol {0} is not defined by any production")]
    UnknownStart(String),

    #[error("unexpected token {token}, expecting {expecting}")]
    UnexpectedToken {
        token: Token,
        expecting: ExpectedSymbols,
    },

    #[error("unexpected end of input, expecting {expecting}")]
    UnexpectedEndOfInput { expecting: ExpectedSymbols },

    #[error("{0}")]
    Custom(String),
}

impl ErrorKind {
    pub fn unexpected_token<I, S>(token: Token, expecting: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::UnexpectedToken {
            token,
            expecting: expecting.into_iter().collect(),
        }
    }

    pub fn unexpected_end_of_input<I, S>(expecting: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::UnexpectedEndOfInput {
            expecting: expecting.into_iter().collect(),
        }
    }

    pub fn invalid_pattern(pattern: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn custom(message: impl ToString) -> Self {
        Self::Custom(message.to_string())
    }

    /// True for the errors raised while parsing a token stream.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedToken { .. } | Self::UnexpectedEndOfInput { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LalrError {
    /// Kind of error
    kind: ErrorKind,
    /// Location of the error in the input.
    pub(crate) span: Option<Span>,
}

impl std::fmt::Display for LalrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} at {}", self.kind, span),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for LalrError {}

impl LalrError {
    pub fn new(kind: impl Into<ErrorKind>, span: Option<Span>) -> Self {
        Self {
            kind: kind.into(),
            span,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// The offending token of a syntax error.
    pub fn token(&self) -> Option<&Token> {
        match &self.kind {
            ErrorKind::UnexpectedToken { token, .. } => Some(token),
            _ => None,
        }
    }
}

impl From<ErrorKind> for LalrError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }
}

/// How a conflicting table cell was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Shift,
    Reduce(ProductionId),
    /// Non-associative operators: the cell is left empty.
    Error,
}

/// A table cell which had more than one legal action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub terminal: String,
    pub resolution: Resolution,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "state {} on {}: ", self.state, self.terminal)?;
        match self.resolution {
            Resolution::Shift => write!(f, "shift"),
            Resolution::Reduce(id) => write!(f, "reduce by production {}", id),
            Resolution::Error => write!(f, "error"),
        }
    }
}

/// A non-fatal diagnostic produced by `ParserGenerator::build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    ShiftReduce {
        count: usize,
        conflicts: Vec<Conflict>,
    },
    ReduceReduce {
        count: usize,
        conflicts: Vec<Conflict>,
    },
    UnusedToken(String),
    UnreachableProduction(String),
    UnreachableState(StateId),
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShiftReduce { count, .. } => {
                write!(f, "{} shift/reduce conflict{}", count, plural(*count))
            }
            Self::ReduceReduce { count, .. } => {
                write!(f, "{} reduce/reduce conflict{}", count, plural(*count))
            }
            Self::UnusedToken(name) => write!(f, "Token '{}' is unused", name),
            Self::UnreachableProduction(name) => {
                write!(f, "Production '{}' is not reachable", name)
            }
            Self::UnreachableState(id) => write!(f, "State {} is not reachable", id),
        }
    }
}

impl BuildWarning {
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Self::ShiftReduce { conflicts, .. } | Self::ReduceReduce { conflicts, .. } => {
                conflicts
            }
            _ => &[],
        }
    }
}
