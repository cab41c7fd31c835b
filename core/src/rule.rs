use itertools::Itertools;

use crate::{
    grammar::Precedence, symbol::SymbolId, ErrorKind, LalrError, LalrResult,
};

/// The production's identifier in the grammar.
///
/// Production 0 is always the augmented `<start> : S` production.
pub type ProductionId = usize;

/// A rule as written by the user: `"LHS : SYM SYM ..."`.
///
/// The right-hand side may be empty, denoting an epsilon production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleDef {
    pub lhs: String,
    pub rhs: Vec<String>,
}

impl std::fmt::Display for RuleDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.rhs.is_empty() {
            write!(f, "{} :", self.lhs)
        } else {
            write!(f, "{} : {}", self.lhs, self.rhs.iter().join(" "))
        }
    }
}

impl std::str::FromStr for RuleDef {
    type Err = LalrError;

    fn from_str(rule: &str) -> LalrResult<Self> {
        let invalid = || LalrError::from(ErrorKind::InvalidRule(rule.to_string()));

        let (lhs, rhs) = rule.split_once(':').ok_or_else(invalid)?;

        let mut lhs = lhs.split_whitespace();
        let name = lhs.next().ok_or_else(invalid)?;
        if lhs.next().is_some() {
            return Err(invalid());
        }

        let rhs: Vec<String> = rhs.split_whitespace().map(str::to_owned).collect();

        // Alternatives are registered as separate productions.
        if rhs.iter().any(|sym| sym == "|" || sym.contains(':')) {
            return Err(invalid());
        }

        Ok(Self {
            lhs: name.to_owned(),
            rhs,
        })
    }
}

impl RuleDef {
    pub fn new<I, S>(lhs: impl ToString, rhs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            lhs: lhs.to_string(),
            rhs: rhs.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The rightmost symbol of the rule satisfying the predicate.
    pub fn rightmost<F>(&self, predicate: F) -> Option<&str>
    where
        F: Fn(&str) -> bool,
    {
        self.rhs
            .iter()
            .rev()
            .map(String::as_str)
            .find(|sym| predicate(sym))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A grammar production
///
/// This object is produced by the grammar with
/// symbols resolved to their identifiers.
pub struct Production {
    pub id: ProductionId,
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
    pub precedence: Precedence,
    pub def: RuleDef,
}

impl std::fmt::Display for Production {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}) {}", self.id, self.def)
    }
}

impl Production {
    /// Number of values the production pops from the parser stack.
    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// Check the production contains a certain symbol in its RHS.
    #[inline(always)]
    pub fn contains(&self, sym: SymbolId) -> bool {
        self.rhs.contains(&sym)
    }
}

pub type PlainReducerFunc<V> = Box<dyn Fn(Vec<V>) -> V + Send + Sync>;
pub type StatefulReducerFunc<V, S> = Box<dyn Fn(&mut S, Vec<V>) -> V + Send + Sync>;

/// A production's semantic action.
///
/// The shape is fixed when the production is registered: plain reducers only
/// see the values of the right-hand side, stateful ones also receive the
/// context passed to `Parser::parse_with_state`.
pub enum Reducer<V, S> {
    Plain(PlainReducerFunc<V>),
    Stateful(StatefulReducerFunc<V, S>),
}

impl<V, S> std::fmt::Debug for Reducer<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => write!(f, "Reducer::Plain"),
            Self::Stateful(_) => write!(f, "Reducer::Stateful"),
        }
    }
}

impl<V, S> Reducer<V, S> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(Vec<V>) -> V + Send + Sync + 'static,
    {
        Self::Plain(Box::new(f))
    }

    pub fn stateful<F>(f: F) -> Self
    where
        F: Fn(&mut S, Vec<V>) -> V + Send + Sync + 'static,
    {
        Self::Stateful(Box::new(f))
    }

    pub fn uses_state(&self) -> bool {
        matches!(self, Self::Stateful(_))
    }

    pub fn reduce(&self, state: &mut S, rhs: Vec<V>) -> V {
        match self {
            Self::Plain(f) => f(rhs),
            Self::Stateful(f) => f(state, rhs),
        }
    }
}
