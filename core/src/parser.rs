use crate::{
    error::BuildWarning,
    grammar::{Assoc, Grammar, GrammarDecl, ProductionDecl},
    lr::{LrParser, LrTable},
    rule::{Reducer, RuleDef},
    token::{traits::IntoTokenResult, Token},
    LalrError, LalrResult,
};

/// Builds the error returned on a syntax error, from the offending token
/// (`None` at the end of input).
pub type ErrorHookFunc = Box<dyn Fn(Option<&Token>) -> LalrError + Send + Sync>;

/// Accumulates terminals, precedence, and productions with their reducers.
///
/// `V` is the semantic value threaded on the parser stack, `S` the context
/// handed to stateful reducers.
///
/// # Example
/// ```
/// use lalrgen_core::{Assoc, ParserGenerator, Token};
///
/// #[derive(Debug, PartialEq)]
/// enum Value { Token(Token), Number(i64) }
///
/// impl From<Token> for Value {
///     fn from(token: Token) -> Self { Value::Token(token) }
/// }
///
/// fn number(value: &Value) -> i64 {
///     match value {
///         Value::Number(n) => *n,
///         Value::Token(tok) => tok.value().parse().unwrap(),
///     }
/// }
///
/// let mut pg = ParserGenerator::<Value>::new(["NUMBER", "PLUS"]);
/// pg.precedence(Assoc::Left, ["PLUS"]);
/// pg.production("expr : expr PLUS expr")
///     .reduce(|rhs| Value::Number(number(&rhs[0]) + number(&rhs[2])));
/// pg.production("expr : NUMBER")
///     .reduce(|rhs| Value::Number(number(&rhs[0])));
///
/// let parser = pg.build().unwrap();
/// let tokens = [
///     Token::new("NUMBER", "1"),
///     Token::new("PLUS", "+"),
///     Token::new("NUMBER", "2"),
/// ];
/// assert_eq!(parser.parse(tokens).unwrap(), Value::Number(3));
/// ```
pub struct ParserGenerator<V, S = ()> {
    decl: GrammarDecl,
    reducers: Vec<Reducer<V, S>>,
    error: Option<ErrorHookFunc>,
    /// Invalid rule strings, reported by `build`.
    errors: Vec<LalrError>,
}

impl<V, S> ParserGenerator<V, S> {
    pub fn new<I, T>(terminals: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Self {
            decl: GrammarDecl {
                terminals: terminals.into_iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
            reducers: vec![],
            error: None,
            errors: vec![],
        }
    }

    /// Declares the next precedence level, higher than all previous ones.
    pub fn precedence<I, T>(&mut self, assoc: Assoc, terminals: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.decl.precedence.push((
            assoc,
            terminals.into_iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    /// Sets the start symbol, instead of the first production's LHS.
    pub fn start(&mut self, name: impl ToString) -> &mut Self {
        self.decl.start = Some(name.to_string());
        self
    }

    /// Starts declaring a production from a rule `"LHS : SYM SYM ..."`.
    ///
    /// The production is registered once a reducer is attached.
    pub fn production(&mut self, rule: &str) -> ProductionBuilder<'_, V, S> {
        ProductionBuilder {
            def: rule.parse(),
            precedence: None,
            generator: self,
        }
    }

    /// Installs the error hook called on syntax errors.
    pub fn error<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Option<&Token>) -> LalrError + Send + Sync + 'static,
    {
        self.error = Some(Box::new(hook));
        self
    }

    /// Validates the grammar and computes the parsing table.
    ///
    /// Conflicts and unused symbols do not fail the build: they are logged
    /// and kept on the parser, see [`Parser::warnings`].
    pub fn build(self) -> LalrResult<Parser<V, S>> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let (grammar, mut warnings) = Grammar::new(&self.decl)?;
        log::debug!(
            "grammar: {} terminals, {} productions",
            grammar.iter_terminals().count(),
            grammar.productions().len()
        );

        let table = LrTable::build(&grammar);
        log::debug!("parsing table: {} states", table.len());

        warnings.extend(table.warnings());
        for warning in warnings.iter() {
            log::warn!("{}", warning);
        }

        Ok(Parser {
            grammar,
            table,
            reducers: self.reducers,
            error: self.error,
            warnings,
        })
    }
}

/// A production being declared, see [`ParserGenerator::production`].
#[must_use = "a production is only registered once a reducer is attached"]
pub struct ProductionBuilder<'g, V, S> {
    generator: &'g mut ParserGenerator<V, S>,
    def: LalrResult<RuleDef>,
    precedence: Option<String>,
}

impl<V, S> ProductionBuilder<'_, V, S> {
    /// Uses the precedence of `terminal` instead of the rightmost terminal's.
    pub fn precedence(mut self, terminal: impl ToString) -> Self {
        self.precedence = Some(terminal.to_string());
        self
    }

    pub fn reduce<F>(self, f: F)
    where
        F: Fn(Vec<V>) -> V + Send + Sync + 'static,
    {
        self.register(Reducer::plain(f))
    }

    /// Registers a reducer which also receives the parse context.
    pub fn reduce_with_state<F>(self, f: F)
    where
        F: Fn(&mut S, Vec<V>) -> V + Send + Sync + 'static,
    {
        self.register(Reducer::stateful(f))
    }

    fn register(self, reducer: Reducer<V, S>) {
        match self.def {
            Ok(def) => {
                self.generator.decl.productions.push(ProductionDecl {
                    def,
                    precedence: self.precedence,
                });
                self.generator.reducers.push(reducer);
            }
            Err(err) => self.generator.errors.push(err),
        }
    }
}

/// A built parser.
///
/// Immutable: every `parse` call owns its stacks, so a parser can be shared
/// between threads.
pub struct Parser<V, S = ()> {
    grammar: Grammar,
    table: LrTable,
    reducers: Vec<Reducer<V, S>>,
    error: Option<ErrorHookFunc>,
    warnings: Vec<BuildWarning>,
}

impl<V, S> Parser<V, S>
where
    V: From<Token>,
{
    /// Parses a token stream, threading `state` through stateful reducers.
    pub fn parse_with_state<I>(&self, tokens: I, state: &mut S) -> LalrResult<V>
    where
        I: IntoIterator,
        I::Item: IntoTokenResult,
    {
        LrParser::new(
            &self.grammar,
            &self.table,
            &self.reducers,
            self.error.as_ref(),
        )
        .parse(tokens, state)
    }
}

impl<V> Parser<V, ()>
where
    V: From<Token>,
{
    pub fn parse<I>(&self, tokens: I) -> LalrResult<V>
    where
        I: IntoIterator,
        I::Item: IntoTokenResult,
    {
        self.parse_with_state(tokens, &mut ())
    }
}

impl<V, S> Parser<V, S> {
    /// Diagnostics collected by `build`.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    pub fn table(&self) -> &LrTable {
        &self.table
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{BuildWarning, Resolution},
        grammar::Assoc,
        token::Token,
        ErrorKind, LalrError,
    };

    use super::ParserGenerator;

    #[derive(Debug, Clone, PartialEq)]
    enum Value {
        Token(Token),
        Number(i64),
    }

    impl From<Token> for Value {
        fn from(token: Token) -> Self {
            Self::Token(token)
        }
    }

    impl Value {
        fn number(&self) -> i64 {
            match self {
                Value::Number(n) => *n,
                Value::Token(tok) => tok.value.parse().unwrap(),
            }
        }
    }

    fn tokens(source: &str) -> Vec<Token> {
        source
            .split_whitespace()
            .map(|lexeme| match lexeme {
                "+" => Token::new("PLUS", lexeme),
                "*" => Token::new("TIMES", lexeme),
                "-" => Token::new("MINUS", lexeme),
                "<" => Token::new("LT", lexeme),
                _ => Token::new("NUMBER", lexeme),
            })
            .collect()
    }

    fn calculator() -> ParserGenerator<Value> {
        let mut pg = ParserGenerator::<Value>::new(["NUMBER", "PLUS", "TIMES", "MINUS"]);
        pg.precedence(Assoc::Left, ["PLUS", "MINUS"])
            .precedence(Assoc::Left, ["TIMES"]);

        pg.production("expr : expr PLUS expr")
            .reduce(|rhs| Value::Number(rhs[0].number() + rhs[2].number()));
        pg.production("expr : expr MINUS expr")
            .reduce(|rhs| Value::Number(rhs[0].number() - rhs[2].number()));
        pg.production("expr : expr TIMES expr")
            .reduce(|rhs| Value::Number(rhs[0].number() * rhs[2].number()));
        pg.production("expr : MINUS expr")
            .precedence("TIMES")
            .reduce(|rhs| Value::Number(-rhs[1].number()));
        pg.production("expr : NUMBER")
            .reduce(|rhs| Value::Number(rhs[0].number()));
        pg
    }

    #[test]
    fn test_operator_precedence() {
        let parser = calculator().build().unwrap();

        assert!(parser.warnings().is_empty());
        assert_eq!(parser.parse(tokens("1 + 2 * 3")).unwrap(), Value::Number(7));
        assert_eq!(parser.parse(tokens("2 * 3 - 1")).unwrap(), Value::Number(5));
        assert_eq!(parser.parse(tokens("- 2 * 3 + 10")).unwrap(), Value::Number(4));
        assert_eq!(parser.parse(tokens("10 - 2 - 3")).unwrap(), Value::Number(5));
    }

    #[test]
    fn test_default_shift_is_right_associative() {
        let mut pg = ParserGenerator::<Value>::new(["NUMBER", "MINUS"]);
        pg.production("expr : expr MINUS expr")
            .reduce(|rhs| Value::Number(rhs[0].number() - rhs[2].number()));
        pg.production("expr : NUMBER")
            .reduce(|rhs| Value::Number(rhs[0].number()));

        let parser = pg.build().unwrap();

        let [BuildWarning::ShiftReduce { count: 1, conflicts }] = parser.warnings() else {
            panic!("expecting one shift/reduce conflict, got {:?}", parser.warnings());
        };
        assert_eq!(conflicts[0].resolution, Resolution::Shift);

        // 10 - (2 - 3)
        assert_eq!(parser.parse(tokens("10 - 2 - 3")).unwrap(), Value::Number(11));
    }

    #[test]
    fn test_nonassoc_rejects_chained_comparisons() {
        let mut pg = ParserGenerator::<Value>::new(["NUMBER", "LT"]);
        pg.precedence(Assoc::NonAssoc, ["LT"]);
        pg.production("expr : expr LT expr")
            .reduce(|rhs| Value::Number((rhs[0].number() < rhs[2].number()) as i64));
        pg.production("expr : NUMBER")
            .reduce(|rhs| Value::Number(rhs[0].number()));

        let parser = pg.build().unwrap();

        assert!(parser.warnings().is_empty());
        assert_eq!(parser.parse(tokens("1 < 2")).unwrap(), Value::Number(1));

        let err = parser.parse(tokens("1 < 2 < 3")).unwrap_err();
        assert!(err.kind().is_syntax_error());
        assert_eq!(err.token(), Some(&Token::new("LT", "<")));
    }

    #[test]
    fn test_stateful_reducers_share_the_context() {
        let mut pg = ParserGenerator::<Value, Vec<i64>>::new(["NUMBER", "PLUS"]);
        pg.precedence(Assoc::Left, ["PLUS"]);
        pg.production("expr : expr PLUS expr")
            .reduce(|rhs| Value::Number(rhs[0].number() + rhs[2].number()));
        pg.production("expr : NUMBER")
            .reduce_with_state(|seen, rhs| {
                seen.push(rhs[0].number());
                Value::Number(rhs[0].number())
            });

        let parser = pg.build().unwrap();

        let mut seen = vec![];
        let value = parser.parse_with_state(tokens("1 + 2 + 3"), &mut seen).unwrap();
        assert_eq!(value, Value::Number(6));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_epsilon_production() {
        let mut pg = ParserGenerator::<Value>::new(["NUMBER"]);
        pg.production("list : list NUMBER")
            .reduce(|rhs| Value::Number(rhs[0].number() + 1));
        pg.production("list :").reduce(|_| Value::Number(0));

        let parser = pg.build().unwrap();

        assert_eq!(parser.parse(tokens("4 5 6")).unwrap(), Value::Number(3));
        assert_eq!(parser.parse(Vec::<Token>::new()).unwrap(), Value::Number(0));
    }

    #[test]
    fn test_error_hook_replaces_syntax_errors() {
        let mut pg = calculator();
        pg.error(|token| match token {
            Some(token) => LalrError::from(ErrorKind::custom(format!("bad token {}", token.value()))),
            None => LalrError::from(ErrorKind::custom("truncated expression")),
        });
        let parser = pg.build().unwrap();

        let err = parser.parse(tokens("1 + * 2")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::custom("bad token *"));

        let err = parser.parse(tokens("1 +")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::custom("truncated expression"));
    }

    #[test]
    fn test_invalid_rule_fails_the_build() {
        let mut pg = ParserGenerator::<Value>::new(["NUMBER"]);
        pg.production("expr NUMBER")
            .reduce(|mut rhs| rhs.remove(0));
        pg.production("expr : NUMBER")
            .reduce(|mut rhs| rhs.remove(0));

        let err = pg.build().err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::InvalidRule("expr NUMBER".into()));
    }

    #[test]
    fn test_start_symbol_override() {
        let mut pg = ParserGenerator::<Value>::new(["NUMBER", "PLUS"]);
        pg.start("sum");
        pg.production("term : NUMBER")
            .reduce(|rhs| Value::Number(rhs[0].number()));
        pg.production("sum : sum PLUS term")
            .reduce(|rhs| Value::Number(rhs[0].number() + rhs[2].number()));
        pg.production("sum : term").reduce(|mut rhs| rhs.remove(0));

        let parser = pg.build().unwrap();
        assert!(parser.warnings().is_empty());
        assert_eq!(parser.parse(tokens("1 + 2")).unwrap(), Value::Number(3));
    }

    #[test]
    fn test_parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<super::Parser<Value, usize>>();
    }
}
