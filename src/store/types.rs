use serde::{Deserialize, Serialize};

/// Position of a unit in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arguments handed to a handler on every call.
///
/// Parameter-producing units see an empty `state`. The slices follow the
/// unit's declared `i_state` / `i_param` order exactly.
#[derive(Debug, Clone, Copy)]
pub struct Inputs<'a> {
    pub t: f64,
    pub state: &'a [f64],
    pub params: &'a [f64],
}

impl<'a> Inputs<'a> {
    pub fn new(t: f64, state: &'a [f64], params: &'a [f64]) -> Self {
        Self { t, state, params }
    }

    /// Inputs for a parameter-producing unit.
    pub fn params_only(t: f64, params: &'a [f64]) -> Self {
        Self { t, state: &[], params }
    }

    #[inline(always)]
    pub fn param(&self, i: usize) -> f64 { self.params[i] }

    #[inline(always)]
    pub fn state(&self, i: usize) -> f64 { self.state[i] }
}

/// The two kinds of unit. A unit with no outputs at all has no role and is
/// rejected by the sanity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Produces entries of the derivative vector.
    Derivatives,
    /// Produces shared parameters.
    Parameters,
}
