//! Discovery of the four global label sets.

use crate::store::Registry;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Global label sets, each in first-seen order over registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSets {
    pub outputs: IndexSet<String>,
    pub inputs: IndexSet<String>,
    pub params: IndexSet<String>,
    pub states: IndexSet<String>,
}

/// Why an explicit state order was refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateOrderMismatch {
    /// Discovered states absent from the explicit order.
    pub missing: Vec<String>,
    /// Labels in the explicit order that are not discovered states.
    pub unexpected: Vec<String>,
    /// Labels listed more than once.
    pub duplicated: Vec<String>,
}

impl LabelSets {
    pub fn discover(registry: &Registry) -> Self {
        let mut sets = Self::default();
        for (_, unit) in registry.iter() {
            sets.outputs.extend(unit.o_state.iter().chain(&unit.o_param).cloned());
            sets.inputs.extend(unit.i_state.iter().chain(&unit.i_param).cloned());
            sets.params.extend(unit.i_param.iter().chain(&unit.o_param).cloned());
            sets.states.extend(unit.i_state.iter().chain(&unit.o_state).cloned());
        }
        sets
    }

    /// Replaces the state order with `order`, which must be exactly a
    /// permutation of the discovered states.
    pub fn reorder_states(&mut self, order: &[String]) -> Result<(), StateOrderMismatch> {
        let mut seen = IndexSet::with_capacity(order.len());
        let mut mismatch = StateOrderMismatch::default();

        for label in order {
            if !seen.insert(label.clone()) {
                mismatch.duplicated.push(label.clone());
            }
            if !self.states.contains(label) {
                mismatch.unexpected.push(label.clone());
            }
        }
        mismatch.missing = self.states.iter().filter(|s| !seen.contains(*s)).cloned().collect();

        if mismatch.missing.is_empty() && mismatch.unexpected.is_empty() && mismatch.duplicated.is_empty() {
            self.states = seen;
            Ok(())
        } else {
            Err(mismatch)
        }
    }

    #[inline]
    pub fn param_slot(&self, label: &str) -> Option<usize> { self.params.get_index_of(label) }

    #[inline]
    pub fn state_index(&self, label: &str) -> Option<usize> { self.states.get_index_of(label) }
}
