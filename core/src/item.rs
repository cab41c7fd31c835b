use std::{
    collections::{BTreeMap, BTreeSet},
    hash::Hash,
};

use itertools::Itertools;

use crate::{grammar::Grammar, rule::Production, symbol::SymbolId};

pub type ItemSetId = usize;

/// Lookahead terminals attached to each item of a set.
pub type Lookaheads<'gen> = BTreeMap<Item<'gen>, BTreeSet<SymbolId>>;

/// A production item.
///
/// # Example
/// expr -> expr • PLUS expr
///
/// Items are compared by production id and position only.
#[derive(Debug, Clone, Copy)]
pub struct Item<'gen> {
    pub production: &'gen Production,
    pub position: usize,
}

impl PartialEq for Item<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Item<'_> {}

impl Hash for Item<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Item<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::fmt::Display for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let def = &self.production.def;
        let mut rhs = def
            .rhs
            .iter()
            .enumerate()
            .map(|(pos, sym)| {
                if pos == self.position {
                    format!("• {}", sym)
                } else {
                    sym.to_string()
                }
            })
            .join(" ");

        if self.is_exhausted() {
            rhs.push_str(" •");
        }

        write!(f, "[({}) {} -> {}]", self.production.id, def.lhs, rhs.trim_start())
    }
}

impl<'gen> Item<'gen> {
    pub fn new(production: &'gen Production, position: usize) -> Self {
        Self {
            production,
            position,
        }
    }

    fn key(&self) -> (usize, usize) {
        (self.production.id, self.position)
    }

    /// Check if we reached the end of a production.
    ///
    /// # Example
    /// A -> w •
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.production.rhs.len()
    }

    /// Returns the symbol right after the dot.
    /// If A -> w •, then returns None.
    pub fn symbol(&self) -> Option<SymbolId> {
        self.production.rhs.get(self.position).copied()
    }

    /// Symbols following the one right after the dot.
    pub fn tail(&self) -> &'gen [SymbolId] {
        self.production
            .rhs
            .get(self.position + 1..)
            .unwrap_or_default()
    }

    /// Returns the item with the dot moved past the next symbol.
    ///
    /// # Example
    /// (A -> • w x).next() -> (A -> w • x)
    pub fn next(&self) -> Option<Self> {
        (!self.is_exhausted()).then(|| Self::new(self.production, self.position + 1))
    }
}

/// A set of items.
///
/// The kernel is the original set of items before closure.
/// Items are additional items from closure.
#[derive(Debug, Default, Clone)]
pub struct ItemSet<'gen> {
    // Identifier of the item set.
    pub id: ItemSetId,
    kernel: BTreeSet<Item<'gen>>,
    items: Vec<Item<'gen>>,
}

impl std::fmt::Display for ItemSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}{{", self.id)?;
        write!(f, "{}", self.iter().map(ToString::to_string).join(", "))?;
        write!(f, "}}")
    }
}

/// Compares kernel sets.
impl PartialEq for ItemSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kernel.eq(&other.kernel)
    }
}

impl<'gen> FromIterator<Item<'gen>> for ItemSet<'gen> {
    /// Collect the iterator as a kernel set.
    fn from_iter<T: IntoIterator<Item = Item<'gen>>>(iter: T) -> Self {
        Self {
            id: 0,
            kernel: iter.into_iter().collect(),
            items: vec![],
        }
    }
}

impl<'gen> ItemSet<'gen> {
    /// Returns the start item set (#0): `<start> -> • S`.
    pub fn start(grammar: &'gen Grammar) -> Self {
        [Item::new(grammar.production(0), 0)].into_iter().collect()
    }

    pub fn kernel(&self) -> &BTreeSet<Item<'gen>> {
        &self.kernel
    }

    /// Iterate over all items within the set.
    pub fn iter(&self) -> impl Iterator<Item = &Item<'gen>> {
        self.kernel.iter().chain(self.items.iter())
    }

    pub fn contains(&self, item: &Item<'gen>) -> bool {
        self.kernel.contains(item) || self.items.contains(item)
    }

    /// Close the item set
    ///
    /// Adds `B -> • γ` for every item whose next symbol is the nonterminal B,
    /// until a fixpoint is reached.
    pub fn close(&mut self, grammar: &'gen Grammar) {
        let mut stack: Vec<_> = self.kernel.iter().copied().collect();

        while let Some(item) = stack.pop() {
            let Some(sym) = item.symbol().filter(|&sym| !grammar.is_terminal(sym)) else {
                continue;
            };

            for item in grammar.productions_of(sym).map(|prod| Item::new(prod, 0)) {
                if !self.contains(&item) {
                    stack.push(item);
                    self.items.push(item);
                }
            }
        }
    }

    /// Iterate over all reachable kernels from the current set.
    ///
    /// The transition returns the symbol, and the kernel.
    pub fn reachable_sets(&self) -> Vec<(SymbolId, ItemSet<'gen>)> {
        let mut kernels = BTreeMap::<SymbolId, ItemSet<'gen>>::default();

        for item in self.iter() {
            if let (Some(sym), Some(next)) = (item.symbol(), item.next()) {
                kernels.entry(sym).or_default().kernel.insert(next);
            }
        }

        kernels.into_iter().collect()
    }

    /// LR(1) closure of the kernel under the given kernel lookaheads.
    ///
    /// For `[A -> α • B β, L]` every `[B -> • γ, FIRST(β L)]` is added, and
    /// lookaheads are merged until nothing changes.
    pub fn close_with_lookaheads(
        &self,
        grammar: &'gen Grammar,
        kernel: &Lookaheads<'gen>,
    ) -> Lookaheads<'gen> {
        let mut closure: Lookaheads<'gen> = self
            .kernel
            .iter()
            .map(|item| (*item, kernel.get(item).cloned().unwrap_or_default()))
            .collect();

        let mut stack: Vec<_> = closure.keys().copied().collect();

        while let Some(item) = stack.pop() {
            let Some(sym) = item.symbol().filter(|&sym| !grammar.is_terminal(sym)) else {
                continue;
            };

            let first = grammar.first_of(item.tail(), &closure[&item]);

            for prod in grammar.productions_of(sym) {
                let derived = Item::new(prod, 0);
                let is_new = !closure.contains_key(&derived);
                let lookaheads = closure.entry(derived).or_default();
                let before = lookaheads.len();
                lookaheads.extend(first.iter().copied());

                if is_new || lookaheads.len() != before {
                    stack.push(derived);
                }
            }
        }

        closure
    }
}
