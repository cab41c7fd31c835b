use crate::{
    grammar::Grammar,
    parser::ErrorHookFunc,
    rule::{ProductionId, Reducer},
    symbol::SymbolId,
    token::{traits::IntoTokenResult, Token},
    ErrorKind, LalrError, LalrResult,
};

mod action;
mod graph;
mod table;
mod transition;

pub use action::Action;
pub use graph::Graph;
pub use table::*;
use transition::Transition;

pub use self::traits::LrTable as _;

pub type StateId = usize;

/// The shift-reduce driver.
///
/// Holds no mutable state: the state and value stacks live in a single
/// `parse` call, so one table may serve concurrent parses.
pub struct LrParser<'p, V, S, Table>
where
    Table: traits::LrTable,
{
    grammar: &'p Grammar,
    table: &'p Table,
    /// One reducer per user production, production `n` uses `reducers[n - 1]`.
    reducers: &'p [Reducer<V, S>],
    error: Option<&'p ErrorHookFunc>,
}

impl<'p, V, S, Table> LrParser<'p, V, S, Table>
where
    Table: traits::LrTable,
    V: From<Token>,
{
    pub fn new(
        grammar: &'p Grammar,
        table: &'p Table,
        reducers: &'p [Reducer<V, S>],
        error: Option<&'p ErrorHookFunc>,
    ) -> Self {
        Self {
            grammar,
            table,
            reducers,
            error,
        }
    }

    pub fn parse<I>(&self, tokens: I, context: &mut S) -> LalrResult<V>
    where
        I: IntoIterator,
        I::Item: IntoTokenResult,
    {
        let mut tokens = tokens.into_iter();
        let mut states: Vec<StateId> = vec![0];
        let mut stack: Vec<V> = Vec::default();
        let mut lookahead: Option<(SymbolId, Option<Token>)> = None;

        loop {
            let state = states.last().copied().unwrap_or_default();

            if let Some(production) = self.table.default_reduction(state) {
                log::trace!("state {}: default reduction by {}", state, self.grammar.production(production));
                self.reduce(production, &mut states, &mut stack, context)?;
                continue;
            }

            let (symbol, token) = match lookahead.take() {
                Some(lookahead) => lookahead,
                None => match tokens.next() {
                    None => (Grammar::EOS, None),
                    Some(token) => {
                        let token = token.into_token_result()?;
                        match self.grammar.terminal_id(&token.name) {
                            Some(symbol) => (symbol, Some(token)),
                            None => return Err(self.syntax_error(state, Some(token))),
                        }
                    }
                },
            };

            match self.table.action(state, symbol) {
                // Push the token on top of the stack and move to the next state.
                Some(Action::Shift(next)) => {
                    log::trace!("state {}: shift {} to {}", state, self.grammar.symbol(symbol), next);
                    if let Some(token) = token {
                        stack.push(token.into());
                    }
                    states.push(next);
                }

                // The lookahead stays pending until it is shifted.
                Some(Action::Reduce(production)) => {
                    log::trace!("state {}: reduce by {}", state, self.grammar.production(production));
                    self.reduce(production, &mut states, &mut stack, context)?;
                    lookahead = Some((symbol, token));
                }

                Some(Action::Accept) => {
                    log::trace!("state {}: accept", state);
                    return stack.pop().ok_or_else(|| self.syntax_error(state, None));
                }

                None => return Err(self.syntax_error(state, token)),
            }
        }
    }

    /// Pops the production's right-hand side, reduces it, and goes to the
    /// state reached over its left-hand side.
    fn reduce(
        &self,
        id: ProductionId,
        states: &mut Vec<StateId>,
        stack: &mut Vec<V>,
        context: &mut S,
    ) -> LalrResult<()> {
        let production = self.grammar.production(id);

        let values = stack.split_off(stack.len().saturating_sub(production.len()));
        states.truncate(states.len().saturating_sub(production.len()));
        let top = states.last().copied().unwrap_or_default();

        let goto = self.table.goto(top, production.lhs).ok_or_else(|| {
            LalrError::from(ErrorKind::custom(format!(
                "no transition from state {} over {}",
                top,
                self.grammar.symbol(production.lhs)
            )))
        })?;

        let value = self.reducers[id - 1].reduce(context, values);
        stack.push(value);
        states.push(goto);

        Ok(())
    }

    /// The error reported when the table has no action for the lookahead.
    fn syntax_error(&self, state: StateId, token: Option<Token>) -> LalrError {
        if let Some(hook) = self.error {
            return hook(token.as_ref());
        }

        let expecting: Vec<_> = self
            .grammar
            .names(self.table.expected(state))
            .map(str::to_owned)
            .collect();

        match token {
            Some(token) => {
                let span = token.span;
                LalrError::new(ErrorKind::unexpected_token(token, expecting), span)
            }
            None => ErrorKind::unexpected_end_of_input(expecting).into(),
        }
    }
}
