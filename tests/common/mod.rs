use lalrgen::Token;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Semantic value of the test grammars.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Token(Token),
    Int(i64),
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

impl Value {
    pub fn int(&self) -> i64 {
        match self {
            Value::Int(value) => *value,
            Value::Token(token) => token.value().parse().unwrap(),
        }
    }
}
