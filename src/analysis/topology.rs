use crate::store::{Registry, UnitId};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("parameter '{label}' is not calculated by any function")]
    Unresolved { label: String },
    #[error("parameter '{label}' depends on itself through units {members:?}")]
    Cycle { label: String, members: Vec<UnitId> },
}

impl ResolutionError {
    pub fn label(&self) -> &str {
        match self {
            ResolutionError::Unresolved { label } | ResolutionError::Cycle { label, .. } => label,
        }
    }
}

/// Resolves which parameter-producing units must run, and in what order,
/// to evaluate a given parameter.
///
/// The dependency structure is an index graph: `producers` maps a parameter
/// label to the first unit (registration order) listing it in `o_param`, and a
/// unit's `i_param` labels are its edges.
pub struct DependencyResolver<'a> {
    registry: &'a Registry,
    producers: IndexMap<&'a str, UnitId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // on the current resolution path
    Visited,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        let mut producers = IndexMap::new();
        for (id, unit) in registry.iter() {
            for label in &unit.o_param {
                producers.entry(label.as_str()).or_insert(id);
            }
        }
        Self { registry, producers }
    }

    /// The first unit, in registration order, whose `o_param` contains `label`.
    pub fn producer_of(&self, label: &str) -> Option<UnitId> {
        self.producers.get(label).copied()
    }

    /// Every unit needed to evaluate `label`, each listed once: the direct
    /// producer first, then its transitive dependencies. Reversing the result
    /// gives a dependency-first execution order.
    ///
    /// Walks the graph iteratively with a visiting/visited marker per unit, so
    /// chain depth is not limited by the call stack. A unit met again while
    /// still on the current path is a cycle; the error lists the whole path
    /// segment forming it.
    pub fn sequence_for(&self, label: &str) -> Result<Vec<UnitId>, ResolutionError> {
        let root = self.producer_of(label)
            .ok_or_else(|| ResolutionError::Unresolved { label: label.to_string() })?;

        let mut state = vec![VisitState::None; self.registry.count()];
        let mut post_order = Vec::new();
        // (unit, index of the next i_param to follow)
        let mut stack: Vec<(UnitId, usize)> = vec![(root, 0)];
        state[root.index()] = VisitState::Visiting;

        while let Some(frame) = stack.last_mut() {
            let unit = frame.0;
            let inputs = match self.registry.get(unit) {
                Some(u) => &u.i_param,
                None => return Err(ResolutionError::Unresolved { label: label.to_string() }),
            };

            if let Some(dep_label) = inputs.get(frame.1) {
                frame.1 += 1;
                let dep = match self.producer_of(dep_label) {
                    Some(dep) => dep,
                    None => {
                        tracing::error!(root = label, missing = dep_label.as_str(), "unresolved parameter dependency");
                        return Err(ResolutionError::Unresolved { label: label.to_string() });
                    }
                };

                match state[dep.index()] {
                    VisitState::Visited => {}
                    VisitState::Visiting => {
                        let start = stack.iter().position(|&(u, _)| u == dep).unwrap_or(0);
                        let members: Vec<UnitId> = stack[start..].iter().map(|&(u, _)| u).collect();
                        tracing::error!(root = label, members = ?members, "parameter dependency cycle");
                        return Err(ResolutionError::Cycle { label: label.to_string(), members });
                    }
                    VisitState::None => {
                        state[dep.index()] = VisitState::Visiting;
                        stack.push((dep, 0));
                    }
                }
            } else {
                state[unit.index()] = VisitState::Visited;
                post_order.push(unit);
                stack.pop();
            }
        }

        // Post-order lists dependencies before dependents; flip it so the
        // direct producer comes first.
        post_order.reverse();
        Ok(post_order)
    }
}
