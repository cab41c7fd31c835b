use std::collections::{BTreeSet, HashMap, HashSet};

use itertools::Itertools as _;

use crate::{
    error::BuildWarning,
    rule::{Production, ProductionId, RuleDef},
    symbol::{Symbol, SymbolId, SymbolKind},
    ErrorKind, LalrError, LalrResult,
};

/// Associativity of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

impl std::fmt::Display for Assoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assoc::Left => write!(f, "left"),
            Assoc::Right => write!(f, "right"),
            Assoc::NonAssoc => write!(f, "nonassoc"),
        }
    }
}

/// The precedence of a terminal or a production.
///
/// Level 0 means "no precedence declared".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precedence {
    pub assoc: Assoc,
    pub level: usize,
}

impl Default for Precedence {
    fn default() -> Self {
        Self {
            assoc: Assoc::Right,
            level: 0,
        }
    }
}

impl Precedence {
    pub fn new(assoc: Assoc, level: usize) -> Self {
        Self { assoc, level }
    }

    pub fn is_declared(&self) -> bool {
        self.level > 0
    }
}

/// A production as registered on the generator, before validation.
#[derive(Debug, Clone)]
pub struct ProductionDecl {
    pub def: RuleDef,
    /// Terminal whose precedence overrides the rightmost terminal's one.
    pub precedence: Option<String>,
}

/// Everything the generator accumulated before `build()`.
#[derive(Debug, Clone, Default)]
pub struct GrammarDecl {
    pub terminals: Vec<String>,
    /// One entry per level, lowest first.
    pub precedence: Vec<(Assoc, Vec<String>)>,
    pub start: Option<String>,
    pub productions: Vec<ProductionDecl>,
}

/// A validated grammar, augmented with `<start> : S`.
///
/// Symbol 0 is `<start>`, symbol 1 is `<eos>`, then come the declared
/// terminals and the nonterminals in order of first definition.
#[derive(Debug)]
pub struct Grammar {
    symbols: Vec<Symbol>,
    index: HashMap<String, SymbolId>,
    productions: Vec<Production>,
    precedence: HashMap<SymbolId, Precedence>,
    nullable: Vec<bool>,
    first: Vec<BTreeSet<SymbolId>>,
}

impl Grammar {
    pub const START: SymbolId = 0;
    pub const EOS: SymbolId = 1;

    /// Validates the declarations and computes the augmented grammar.
    ///
    /// Non-fatal findings (unused tokens, unreachable productions) are
    /// returned next to the grammar.
    pub fn new(decl: &GrammarDecl) -> LalrResult<(Self, Vec<BuildWarning>)> {
        let mut grammar = Self {
            symbols: vec![Symbol::start(), Symbol::eos()],
            index: HashMap::default(),
            productions: vec![],
            precedence: HashMap::default(),
            nullable: vec![],
            first: vec![],
        };

        for term in decl.terminals.iter() {
            if grammar.index.contains_key(term) {
                return Err(ErrorKind::DuplicateTerminal(term.clone()).into());
            }
            grammar.push_symbol(Symbol::term(term));
        }

        if decl.productions.is_empty() {
            return Err(ErrorKind::NoProductions.into());
        }

        grammar.declare_precedence(&decl.precedence)?;

        for prod in decl.productions.iter() {
            match grammar.symbol_id(&prod.def.lhs) {
                Some(id) if grammar.symbols[id].is_terminal() => {
                    return Err(ErrorKind::RuleNameIsTerminal(prod.def.lhs.clone()).into())
                }
                Some(_) => {}
                None => {
                    grammar.push_symbol(Symbol::nterm(&prod.def.lhs));
                }
            }
        }

        let start = match &decl.start {
            Some(name) => grammar
                .symbol_id(name)
                .filter(|&id| grammar.symbols[id].kind() == SymbolKind::NonTerminal)
                .ok_or_else(|| LalrError::from(ErrorKind::UnknownStart(name.clone())))?,
            None => grammar.index[&decl.productions[0].def.lhs],
        };

        grammar.productions.push(Production {
            id: 0,
            lhs: Self::START,
            rhs: vec![start],
            precedence: Precedence::default(),
            def: RuleDef::new(crate::symbol::START, [grammar.symbols[start].id.as_str()]),
        });

        for prod in decl.productions.iter() {
            let production = grammar.resolve(prod)?;
            grammar.productions.push(production);
        }

        grammar.compute_first_sets();

        let warnings = grammar
            .unused_terminals()
            .map(|id| BuildWarning::UnusedToken(grammar.symbols[id].id.clone()))
            .chain(
                grammar
                    .unreachable_nonterminals()
                    .map(|id| BuildWarning::UnreachableProduction(grammar.symbols[id].id.clone())),
            )
            .collect();

        Ok((grammar, warnings))
    }

    fn push_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = self.symbols.len();
        self.index.insert(symbol.id.clone(), id);
        self.symbols.push(symbol);
        id
    }

    fn declare_precedence(&mut self, levels: &[(Assoc, Vec<String>)]) -> LalrResult<()> {
        for (level, (assoc, terms)) in levels.iter().enumerate() {
            for term in terms {
                let id = self
                    .symbol_id(term)
                    .ok_or_else(|| LalrError::from(ErrorKind::UnknownPrecedenceTerminal(term.clone())))?;

                if self.precedence.contains_key(&id) {
                    return Err(ErrorKind::DuplicatePrecedence(term.clone()).into());
                }

                self.precedence.insert(id, Precedence::new(*assoc, level + 1));
            }
        }

        Ok(())
    }

    /// Turns a declared production into one referencing symbol identifiers.
    fn resolve(&self, decl: &ProductionDecl) -> LalrResult<Production> {
        let rhs = decl
            .def
            .rhs
            .iter()
            .map(|name| {
                self.symbol_id(name)
                    .filter(|&id| !self.symbols[id].is_start() && !self.symbols[id].is_eos())
                    .ok_or_else(|| {
                        LalrError::from(ErrorKind::UndefinedSymbol {
                            symbol: name.clone(),
                            production: decl.def.to_string(),
                        })
                    })
            })
            .collect::<LalrResult<Vec<_>>>()?;

        let precedence = match &decl.precedence {
            Some(name) => self
                .symbol_id(name)
                .and_then(|id| self.precedence.get(&id))
                .copied()
                .ok_or_else(|| {
                    LalrError::from(ErrorKind::UnknownPrecedence {
                        precedence: name.clone(),
                        production: decl.def.to_string(),
                    })
                })?,
            None => rhs
                .iter()
                .rev()
                .find(|&&id| self.symbols[id].is_terminal())
                .and_then(|id| self.precedence.get(id))
                .copied()
                .unwrap_or_default(),
        };

        Ok(Production {
            id: self.productions.len(),
            lhs: self.index[&decl.def.lhs],
            rhs,
            precedence,
            def: decl.def.clone(),
        })
    }

    fn compute_first_sets(&mut self) {
        self.nullable = vec![false; self.symbols.len()];
        self.first = self
            .symbols
            .iter()
            .enumerate()
            .map(|(id, sym)| {
                if sym.is_terminal() {
                    BTreeSet::from_iter([id])
                } else {
                    BTreeSet::default()
                }
            })
            .collect();

        let mut changed = true;

        while changed {
            changed = false;

            for prod in self.productions.iter() {
                let mut first = BTreeSet::default();
                let mut nullable = true;

                for &sym in prod.rhs.iter() {
                    first.extend(self.first[sym].iter().copied());
                    if !self.nullable[sym] {
                        nullable = false;
                        break;
                    }
                }

                let before = self.first[prod.lhs].len();
                self.first[prod.lhs].extend(first);
                changed |= self.first[prod.lhs].len() != before;

                if nullable && !self.nullable[prod.lhs] {
                    self.nullable[prod.lhs] = true;
                    changed = true;
                }
            }
        }
    }

    /// Declared terminals which are never used by a production.
    fn unused_terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        let used: HashSet<SymbolId> = self
            .productions
            .iter()
            .flat_map(|prod| prod.rhs.iter().copied())
            .collect();

        self.iter_terminals()
            .filter(|&id| id != Self::EOS)
            .filter(move |id| !used.contains(id))
    }

    /// Nonterminals which cannot be derived from the start symbol.
    fn unreachable_nonterminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        let mut reachable = HashSet::<SymbolId>::from_iter([Self::START]);
        let mut stack = vec![Self::START];

        while let Some(sym) = stack.pop() {
            for prod in self.productions_of(sym) {
                for &rhs in prod.rhs.iter() {
                    if !self.symbols[rhs].is_terminal() && reachable.insert(rhs) {
                        stack.push(rhs);
                    }
                }
            }
        }

        self.iter_non_terminals()
            .filter(move |id| !reachable.contains(id))
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.index.get(name).copied()
    }

    /// The terminal a token name refers to.
    pub fn terminal_id(&self, name: &str) -> Option<SymbolId> {
        self.symbol_id(name)
            .filter(|&id| self.symbols[id].kind() == SymbolKind::Terminal)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn is_terminal(&self, id: SymbolId) -> bool {
        self.symbols[id].is_terminal()
    }

    /// Iterate over terminals, `<eos>` included.
    pub fn iter_terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len()).filter(|&id| self.symbols[id].is_terminal())
    }

    /// Iterate over user nonterminals, `<start>` excluded.
    pub fn iter_non_terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len())
            .filter(|&id| self.symbols[id].kind() == SymbolKind::NonTerminal)
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    /// Iterate the productions of a specific nonterminal, in declaration order.
    pub fn productions_of(&self, lhs: SymbolId) -> impl Iterator<Item = &Production> + '_ {
        self.productions.iter().filter(move |prod| prod.lhs == lhs)
    }

    pub fn precedence_of(&self, terminal: SymbolId) -> Precedence {
        self.precedence.get(&terminal).copied().unwrap_or_default()
    }

    pub fn is_nullable(&self, id: SymbolId) -> bool {
        self.nullable[id]
    }

    /// FIRST(seq lookaheads)
    pub fn first_of<'a, I>(&self, seq: &[SymbolId], lookaheads: I) -> BTreeSet<SymbolId>
    where
        I: IntoIterator<Item = &'a SymbolId>,
    {
        let mut set = BTreeSet::default();

        for &sym in seq {
            set.extend(self.first[sym].iter().copied());
            if !self.nullable[sym] {
                return set;
            }
        }

        set.extend(lookaheads.into_iter().copied());
        set
    }

    /// Human readable names of a set of symbols.
    pub fn names<'a, I>(&'a self, ids: I) -> impl Iterator<Item = &'a str> + 'a
    where
        I: IntoIterator<Item = SymbolId>,
        I::IntoIter: 'a,
    {
        ids.into_iter().map(|id| self.symbols[id].id.as_str())
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.productions.iter().join("\n"))
    }
}
