use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::{
    grammar::Grammar,
    item::{Item, ItemSet, Lookaheads},
    symbol::SymbolId,
};

use super::StateId;

/// The LALR(1) automaton.
///
/// States are LR(0) item sets identified by their kernel, so states with the
/// same core are shared and their lookaheads are unioned.
pub struct Graph<'gen> {
    pub(super) grammar: &'gen Grammar,
    pub(super) sets: Vec<ItemSet<'gen>>,
    pub(super) edges: Vec<(StateId, SymbolId, StateId)>,
    /// Kernel lookaheads of each state.
    pub(super) lookaheads: Vec<Lookaheads<'gen>>,
    /// LR(1) closure of each state.
    pub(super) closures: Vec<Lookaheads<'gen>>,
    index: HashMap<BTreeSet<Item<'gen>>, StateId>,
    goto: HashMap<(StateId, SymbolId), StateId>,
}

impl<'gen> Graph<'gen> {
    pub fn new(grammar: &'gen Grammar) -> Self {
        let start = ItemSet::start(grammar);

        Self {
            grammar,
            index: HashMap::from_iter([(start.kernel().clone(), 0)]),
            sets: vec![start],
            edges: vec![],
            lookaheads: vec![],
            closures: vec![],
            goto: HashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn get(&self, id: StateId) -> Option<&ItemSet<'gen>> {
        self.sets.get(id)
    }

    /// The state reached from `from` over `symbol`.
    pub fn goto(&self, from: StateId, symbol: SymbolId) -> Option<StateId> {
        self.goto.get(&(from, symbol)).copied()
    }

    /// Push a new set in the graph, if it does not yet exist.
    ///
    /// Returns the id of the set and whether it was inserted.
    fn push(&mut self, mut set: ItemSet<'gen>) -> (StateId, bool) {
        if let Some(&id) = self.index.get(set.kernel()) {
            return (id, false);
        }

        let id = self.sets.len();
        set.id = id;
        self.index.insert(set.kernel().clone(), id);
        self.sets.push(set);
        (id, true)
    }

    pub fn build(&mut self) {
        self.build_lr0();
        self.propagate_lookaheads();

        let grammar = self.grammar;
        self.closures = self
            .sets
            .iter()
            .zip(self.lookaheads.iter())
            .map(|(set, kernel)| set.close_with_lookaheads(grammar, kernel))
            .collect();
    }

    /// Builds the canonical collection of LR(0) item sets.
    fn build_lr0(&mut self) {
        let mut queue = VecDeque::from_iter([0]);
        let grammar = self.grammar;

        while let Some(set_id) = queue.pop_front() {
            self.sets[set_id].close(grammar);

            for (symbol, kernel) in self.sets[set_id].reachable_sets() {
                let (to_id, inserted) = self.push(kernel);
                if inserted {
                    queue.push_back(to_id);
                }

                self.edges.push((set_id, symbol, to_id));
                self.goto.insert((set_id, symbol), to_id);
            }
        }
    }

    /// Spreads lookaheads along the GOTO edges until a fixpoint is reached.
    ///
    /// The start item gets `<eos>`; every other kernel item receives the
    /// lookaheads of the closure items it was advanced from.
    fn propagate_lookaheads(&mut self) {
        let grammar = self.grammar;

        self.lookaheads = self
            .sets
            .iter()
            .map(|set| {
                set.kernel()
                    .iter()
                    .map(|item| (*item, BTreeSet::default()))
                    .collect()
            })
            .collect();

        self.lookaheads[0]
            .values_mut()
            .for_each(|lookaheads| {
                lookaheads.insert(Grammar::EOS);
            });

        let mut changed = true;

        while changed {
            changed = false;

            for state in 0..self.sets.len() {
                let closure = self.sets[state].close_with_lookaheads(grammar, &self.lookaheads[state]);

                for (item, lookaheads) in closure {
                    let (Some(symbol), Some(next)) = (item.symbol(), item.next()) else {
                        continue;
                    };
                    let Some(to) = self.goto(state, symbol) else {
                        continue;
                    };

                    let target = self.lookaheads[to].entry(next).or_default();
                    let before = target.len();
                    target.extend(lookaheads);
                    changed |= target.len() != before;
                }
            }
        }
    }
}
