#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
    Eos,
    Start,
}

/// Index of a symbol in the grammar's symbol table.
pub type SymbolId = usize;

/// Name of the augmented start symbol.
pub const START: &str = "<start>";
/// Name of the end-of-input terminal.
pub const EOS: &str = "<eos>";

/// Defines a symbol
///
/// Identity is by name.
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct Symbol {
    /// *Unique* identifier of the symbol
    pub id: String,
    kind: SymbolKind,
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Symbol {
    pub fn new(id: impl ToString, kind: SymbolKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
        }
    }

    pub fn term(id: impl ToString) -> Self {
        Self::new(id, SymbolKind::Terminal)
    }

    pub fn nterm(id: impl ToString) -> Self {
        Self::new(id, SymbolKind::NonTerminal)
    }

    /// Creates the end-of-input terminal (<eos>)
    pub fn eos() -> Self {
        Self::new(EOS, SymbolKind::Eos)
    }

    /// Creates the augmented start symbol (<start>)
    pub fn start() -> Self {
        Self::new(START, SymbolKind::Start)
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    #[inline(always)]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Eos | SymbolKind::Terminal)
    }

    #[inline(always)]
    pub fn is_eos(&self) -> bool {
        matches!(self.kind, SymbolKind::Eos)
    }

    #[inline(always)]
    pub fn is_start(&self) -> bool {
        matches!(self.kind, SymbolKind::Start)
    }
}
