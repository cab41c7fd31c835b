use crate::{span::Span, LalrResult};

pub mod traits {
    use crate::LalrResult;

    use super::Token;

    /// Anything a token source may yield.
    ///
    /// Hand-built token lists yield plain [`Token`]s, lexers yield
    /// `LalrResult<Token>` so that lexical errors reach the parser.
    pub trait IntoTokenResult {
        fn into_token_result(self) -> LalrResult<Token>;
    }
}

/// A lexeme: the name of the rule which matched it, and the matched text.
#[derive(Debug, Clone, Eq)]
pub struct Token {
    pub name: String,
    pub value: String,
    pub span: Option<Span>,
}

/// Tokens are compared by name and value, the span is ignored.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?})", self.name, self.value)
    }
}

impl Token {
    pub fn new<N, S>(name: N, value: S) -> Self
    where
        N: ToString,
        S: ToString,
    {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl traits::IntoTokenResult for Token {
    fn into_token_result(self) -> LalrResult<Token> {
        Ok(self)
    }
}

impl traits::IntoTokenResult for LalrResult<Token> {
    fn into_token_result(self) -> LalrResult<Token> {
        self
    }
}
