use crate::{item::Lookaheads, symbol::SymbolId};

use super::{graph::Graph, StateId};

/// A state of the automaton with its outgoing edges and its closed items.
pub struct Transition<'gen, 'graph> {
    pub(super) from: StateId,
    pub(super) edges: Vec<(SymbolId, StateId)>,
    pub(super) items: &'graph Lookaheads<'gen>,
}

impl<'gen> Graph<'gen> {
    pub fn iter_transitions(&self) -> impl Iterator<Item = Transition<'gen, '_>> {
        self.sets.iter().map(|set| Transition {
            from: set.id,
            edges: self
                .edges
                .iter()
                .filter(|(from, _, _)| set.id == *from)
                .map(|(_, sym, to)| (*sym, *to))
                .collect(),
            items: &self.closures[set.id],
        })
    }
}
