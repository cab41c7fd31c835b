//! Lexer and LALR(1) parser generator.
//!
//! Token patterns are declared on a [`LexerGenerator`], grammar productions
//! and their reducers on a [`ParserGenerator`]. Both compile once, with
//! `build()`, into immutable analyzers.
pub use lalrgen_core::*;
