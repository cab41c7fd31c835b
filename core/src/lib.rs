pub mod error;
pub mod grammar;
pub mod item;
pub mod lexer;
pub mod lr;
pub mod parser;
pub mod rule;
pub mod span;
pub mod symbol;
pub mod token;

pub use error::{BuildWarning, Conflict, ErrorKind, LalrError, Resolution};
pub use grammar::{Assoc, Grammar};
pub use lexer::{Lexer, LexerGenerator, LexerState, LexerStream, Transition};
pub use lr::{Action, LrTable};
pub use parser::{Parser, ParserGenerator, ProductionBuilder};
pub use span::{Cursor, Span};
pub use token::Token;

pub type LalrResult<T> = Result<T, LalrError>;

pub mod traits {
    pub use crate::lr::traits::LrTable;
    pub use crate::token::traits::IntoTokenResult;
}
