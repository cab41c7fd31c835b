use std::fmt;

use crate::rule::ProductionId;

use super::StateId;

/// An ACTION table entry, printed as `s<state>`, `r<production>` or `acc`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Action {
    /// Push the lookahead and move to the state.
    Shift(StateId),
    /// Pop the production's right-hand side and call its reducer.
    Reduce(ProductionId),
    /// Reduce the augmented production on `<eos>`.
    Accept,
}

impl Action {
    /// State entered by a shift.
    pub fn shifted_to(&self) -> Option<StateId> {
        match self {
            Self::Shift(state) => Some(*state),
            _ => None,
        }
    }

    /// Production reduced by a reduction.
    pub fn reduced_by(&self) -> Option<ProductionId> {
        match self {
            Self::Reduce(production) => Some(*production),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(state) => write!(f, "s{state}"),
            Self::Reduce(production) => write!(f, "r{production}"),
            Self::Accept => f.write_str("acc"),
        }
    }
}
