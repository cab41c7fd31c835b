use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools as _;
use prettytable::Table as PtTable;

use crate::{
    error::{BuildWarning, Conflict, Resolution},
    grammar::{Assoc, Grammar, Precedence},
    rule::ProductionId,
    symbol::SymbolId,
};

use super::{Action, Graph, StateId, Transition};

pub mod traits {
    use crate::{lr::StateId, rule::ProductionId, symbol::SymbolId};

    use super::super::Action;

    pub trait LrTable {
        fn action(&self, state: StateId, terminal: SymbolId) -> Option<Action>;
        fn goto(&self, state: StateId, non_terminal: SymbolId) -> Option<StateId>;

        /// The production to reduce by without reading a lookahead.
        fn default_reduction(&self, state: StateId) -> Option<ProductionId>;

        /// Terminals having an action in the state, sorted by id.
        fn expected(&self, state: StateId) -> Vec<SymbolId>;
    }
}

/// Conflicts met while filling the table.
#[derive(Debug, Default)]
struct Conflicts {
    shift_reduce: Vec<Conflict>,
    reduce_reduce: Vec<Conflict>,
}

#[derive(Debug, PartialEq, Eq)]
struct Row {
    actions: HashMap<SymbolId, Action>,
    goto: HashMap<SymbolId, StateId>,
    /// Cells emptied by non-associative operators.
    errors: HashSet<SymbolId>,
}

impl Row {
    pub fn action(&self, symbol_id: &SymbolId) -> Option<Action> {
        self.actions.get(symbol_id).copied()
    }

    pub fn goto(&self, symbol_id: &SymbolId) -> Option<StateId> {
        self.goto.get(symbol_id).copied()
    }

    /// A row whose only action is a reduction.
    ///
    /// Rows with error cells need the lookahead, so they never reduce by
    /// default.
    fn default_reduction(&self) -> Option<ProductionId> {
        if !self.errors.is_empty() {
            return None;
        }

        self.actions
            .values()
            .exactly_one()
            .ok()
            .and_then(Action::reduced_by)
    }

    fn from_transition(
        transition: Transition<'_, '_>,
        grammar: &Grammar,
        conflicts: &mut Conflicts,
    ) -> Self {
        let state = transition.from;
        let mut actions = HashMap::<SymbolId, Action>::default();
        let mut goto = HashMap::<SymbolId, StateId>::default();
        let mut errors = HashSet::<SymbolId>::default();

        for &(sym, to) in transition.edges.iter() {
            if grammar.is_terminal(sym) {
                actions.insert(sym, Action::Shift(to));
            } else {
                goto.insert(sym, to);
            }
        }

        let mut reductions = BTreeMap::<SymbolId, Vec<ProductionId>>::default();
        for (item, lookaheads) in transition.items.iter().filter(|(item, _)| item.is_exhausted()) {
            for &terminal in lookaheads.iter() {
                reductions.entry(terminal).or_default().push(item.production.id);
            }
        }

        for (terminal, mut candidates) in reductions {
            let name = &grammar.symbol(terminal).id;

            // The production declared first wins.
            candidates.sort_unstable();
            candidates.dedup();
            let production = candidates[0];

            conflicts
                .reduce_reduce
                .extend(candidates.iter().skip(1).map(|_| Conflict {
                    state,
                    terminal: name.clone(),
                    resolution: Resolution::Reduce(production),
                }));

            if production == 0 {
                actions.insert(terminal, Action::Accept);
                continue;
            }

            if !matches!(actions.get(&terminal), Some(Action::Shift(_))) {
                actions.insert(terminal, Action::Reduce(production));
                continue;
            }

            let (resolution, reported) = resolve_shift_reduce(
                grammar.precedence_of(terminal),
                grammar.production(production).precedence,
                production,
            );

            match resolution {
                Resolution::Shift => {}
                Resolution::Reduce(id) => {
                    actions.insert(terminal, Action::Reduce(id));
                }
                Resolution::Error => {
                    actions.remove(&terminal);
                    errors.insert(terminal);
                }
            }

            if reported {
                conflicts.shift_reduce.push(Conflict {
                    state,
                    terminal: name.clone(),
                    resolution,
                });
            }
        }

        Self {
            actions,
            goto,
            errors,
        }
    }
}

/// Settles a shift/reduce conflict from the lookahead's and the
/// production's precedence.
///
/// Returns the resolution and whether it must be reported; conflicts
/// settled by declared precedence are silent.
fn resolve_shift_reduce(
    shift: Precedence,
    reduce: Precedence,
    production: ProductionId,
) -> (Resolution, bool) {
    if shift.level < reduce.level || (shift.level == reduce.level && reduce.assoc == Assoc::Left) {
        (
            Resolution::Reduce(production),
            !shift.is_declared() && !reduce.is_declared(),
        )
    } else if shift.level == reduce.level && reduce.assoc == Assoc::NonAssoc {
        (Resolution::Error, false)
    } else {
        (Resolution::Shift, !reduce.is_declared())
    }
}

/// The LALR(1) action and goto table.
#[derive(PartialEq)]
pub struct LrTable {
    /// Symbol names, indexed by id
    symbols: Vec<String>,
    terminals: Vec<SymbolId>,
    non_terminals: Vec<SymbolId>,
    /// The table rows
    rows: Vec<Row>,
    default_reductions: Vec<Option<ProductionId>>,
    sr_conflicts: Vec<Conflict>,
    rr_conflicts: Vec<Conflict>,
}

impl std::fmt::Debug for LrTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::fmt::Display for LrTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut table = PtTable::new();

        table.add_row(
            ["#".to_string()]
                .into_iter()
                .chain(
                    self.terminals
                        .iter()
                        .chain(self.non_terminals.iter())
                        .map(|&sym| self.symbols[sym].clone()),
                )
                .collect(),
        );

        for (id, row) in self.rows.iter().enumerate() {
            table.add_row(
                [id.to_string()]
                    .into_iter()
                    .chain(self.terminals.iter().map(|sym| {
                        row.action(sym)
                            .map(|action| action.to_string())
                            .unwrap_or_default()
                    }))
                    .chain(self.non_terminals.iter().map(|sym| {
                        row.goto(sym)
                            .map(|state| state.to_string())
                            .unwrap_or_default()
                    }))
                    .collect(),
            );
        }

        write!(f, "{}", table)
    }
}

impl traits::LrTable for LrTable {
    fn action(&self, state: StateId, terminal: SymbolId) -> Option<Action> {
        self.rows.get(state).and_then(|row| row.action(&terminal))
    }

    fn goto(&self, state: StateId, non_terminal: SymbolId) -> Option<StateId> {
        self.rows.get(state).and_then(|row| row.goto(&non_terminal))
    }

    fn default_reduction(&self, state: StateId) -> Option<ProductionId> {
        self.default_reductions.get(state).copied().flatten()
    }

    fn expected(&self, state: StateId) -> Vec<SymbolId> {
        self.rows
            .get(state)
            .map(|row| row.actions.keys().copied().sorted().collect())
            .unwrap_or_default()
    }
}

impl LrTable {
    /// Number of states.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn sr_conflicts(&self) -> &[Conflict] {
        &self.sr_conflicts
    }

    pub fn rr_conflicts(&self) -> &[Conflict] {
        &self.rr_conflicts
    }

    fn from_graph(graph: &Graph<'_>) -> Self {
        let grammar = graph.grammar;
        let mut conflicts = Conflicts::default();

        let rows: Vec<Row> = graph
            .iter_transitions()
            .map(|transition| Row::from_transition(transition, grammar, &mut conflicts))
            .collect();

        Self {
            symbols: grammar.symbols().iter().map(|sym| sym.id.clone()).collect(),
            terminals: grammar.iter_terminals().collect(),
            non_terminals: grammar.iter_non_terminals().collect(),
            default_reductions: rows.iter().map(Row::default_reduction).collect(),
            rows,
            sr_conflicts: conflicts.shift_reduce,
            rr_conflicts: conflicts.reduce_reduce,
        }
    }

    /// Build the LALR(1) table of a grammar.
    pub fn build(grammar: &Grammar) -> Self {
        let mut graph = Graph::new(grammar);
        graph.build();

        log::debug!(
            "built LALR automaton: {} productions, {} states",
            grammar.productions().len(),
            graph.len()
        );

        Self::from_graph(&graph)
    }

    /// States no shift nor goto leads to, once conflicts are settled.
    pub fn unreachable_states(&self) -> Vec<StateId> {
        let mut reachable = HashSet::<StateId>::from_iter([0]);
        let mut stack = vec![0];

        while let Some(state) = stack.pop() {
            let row = &self.rows[state];
            let targets = row
                .actions
                .values()
                .filter_map(Action::shifted_to)
                .chain(row.goto.values().copied());

            for to in targets {
                if reachable.insert(to) {
                    stack.push(to);
                }
            }
        }

        (0..self.rows.len())
            .filter(|id| !reachable.contains(id))
            .collect()
    }

    /// Conflict and reachability diagnostics of the table.
    pub fn warnings(&self) -> Vec<BuildWarning> {
        let mut warnings = vec![];

        if !self.sr_conflicts.is_empty() {
            warnings.push(BuildWarning::ShiftReduce {
                count: self.sr_conflicts.len(),
                conflicts: self.sr_conflicts.clone(),
            });
        }

        if !self.rr_conflicts.is_empty() {
            warnings.push(BuildWarning::ReduceReduce {
                count: self.rr_conflicts.len(),
                conflicts: self.rr_conflicts.clone(),
            });
        }

        warnings.extend(
            self.unreachable_states()
                .into_iter()
                .map(BuildWarning::UnreachableState),
        );

        warnings
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{BuildWarning, Resolution},
        fixtures::{build_grammar, decl},
        grammar::{Assoc, Grammar},
        lr::Action,
    };

    use super::{traits::LrTable as _, LrTable};

    fn expr_grammar(assoc: Option<Assoc>) -> Grammar {
        let mut d = decl(
            &["NUMBER", "PLUS"],
            &["main : expr", "expr : expr PLUS expr", "expr : NUMBER"],
        );
        if let Some(assoc) = assoc {
            d.precedence = vec![(assoc, vec!["PLUS".into()])];
        }
        Grammar::new(&d).unwrap().0
    }

    /// The state reached after `NUMBER PLUS NUMBER`, reduced to `expr PLUS expr`.
    fn chained_state(table: &LrTable, grammar: &Grammar) -> usize {
        let number = grammar.symbol_id("NUMBER").unwrap();
        let plus = grammar.symbol_id("PLUS").unwrap();
        let expr = grammar.symbol_id("expr").unwrap();

        let after_expr = table.goto(0, expr).unwrap();
        let Some(Action::Shift(after_plus)) = table.action(after_expr, plus) else {
            panic!("expecting a shift on PLUS");
        };
        assert!(matches!(table.action(after_plus, number), Some(Action::Shift(_))));
        table.goto(after_plus, expr).unwrap()
    }

    #[test]
    fn test_ambiguity_yields_one_shift_reduce_conflict() {
        let grammar = expr_grammar(None);
        let table = LrTable::build(&grammar);
        let plus = grammar.symbol_id("PLUS").unwrap();

        assert_eq!(table.sr_conflicts().len(), 1);
        assert!(table.rr_conflicts().is_empty());

        let conflict = &table.sr_conflicts()[0];
        assert_eq!(conflict.terminal, "PLUS");
        assert_eq!(conflict.resolution, Resolution::Shift);

        let state = chained_state(&table, &grammar);
        assert!(matches!(table.action(state, plus), Some(Action::Shift(_))));
    }

    #[test]
    fn test_left_precedence_reduces_silently() {
        let grammar = expr_grammar(Some(Assoc::Left));
        let table = LrTable::build(&grammar);
        let plus = grammar.symbol_id("PLUS").unwrap();

        assert!(table.sr_conflicts().is_empty());
        assert!(table.warnings().is_empty());

        let state = chained_state(&table, &grammar);
        assert!(matches!(table.action(state, plus), Some(Action::Reduce(_))));
    }

    #[test]
    fn test_nonassoc_leaves_the_cell_empty() {
        let grammar = expr_grammar(Some(Assoc::NonAssoc));
        let table = LrTable::build(&grammar);
        let plus = grammar.symbol_id("PLUS").unwrap();

        assert!(table.sr_conflicts().is_empty());

        let state = chained_state(&table, &grammar);
        assert_eq!(table.action(state, plus), None);
        assert!(table.expected(state).contains(&Grammar::EOS));
        // Reducing by default would swallow the chained operator.
        assert_eq!(table.default_reduction(state), None);
    }

    #[test]
    fn test_precedence_can_strand_a_state() {
        // Reducing `e : C` on A makes the `e : C A` state unreachable.
        let mut d = decl(&["A", "B", "C"], &["s : e", "s : e A B", "e : C", "e : C A"]);
        d.precedence = vec![
            (Assoc::Left, vec!["A".into()]),
            (Assoc::Left, vec!["C".into()]),
        ];
        let grammar = Grammar::new(&d).unwrap().0;
        let table = LrTable::build(&grammar);

        assert!(table.sr_conflicts().is_empty());

        let unreachable = table.unreachable_states();
        assert_eq!(unreachable.len(), 1);
        assert!(table
            .warnings()
            .contains(&BuildWarning::UnreachableState(unreachable[0])));
    }

    #[test]
    fn test_reduce_reduce_conflict_keeps_first_production() {
        let grammar = build_grammar(&["X"], &["s : a", "s : b", "a : X", "b : X"]);
        let table = LrTable::build(&grammar);
        let x = grammar.symbol_id("X").unwrap();

        assert_eq!(table.rr_conflicts().len(), 1);

        let Some(Action::Shift(after_x)) = table.action(0, x) else {
            panic!("expecting a shift on X");
        };
        // (3) a : X
        assert_eq!(table.action(after_x, Grammar::EOS), Some(Action::Reduce(3)));
        assert_eq!(table.default_reduction(after_x), Some(3));
        assert_eq!(
            table.warnings()[0].to_string(),
            "1 reduce/reduce conflict"
        );
    }

    #[test]
    fn test_accept_and_default_reductions() {
        let grammar = expr_grammar(Some(Assoc::Left));
        let table = LrTable::build(&grammar);
        let main = grammar.symbol_id("main").unwrap();
        let number = grammar.symbol_id("NUMBER").unwrap();

        let accepting = table.goto(0, main).unwrap();
        assert_eq!(table.action(accepting, Grammar::EOS), Some(Action::Accept));
        assert_eq!(table.default_reduction(accepting), None);

        // NUMBER • is followed by PLUS or <eos>, so a lookahead is needed.
        let Some(Action::Shift(after_number)) = table.action(0, number) else {
            panic!("expecting a shift on NUMBER");
        };
        assert_eq!(table.default_reduction(after_number), None);
        assert_eq!(table.expected(after_number).len(), 2);
    }

    #[test]
    fn test_table_display() {
        let grammar = expr_grammar(None);
        let table = LrTable::build(&grammar);
        let rendered = table.to_string();

        assert!(rendered.contains("acc"));
        assert!(rendered.contains("<eos>"));
        assert!(rendered.contains("expr"));
        assert_eq!(table.len(), 6);
    }
}
