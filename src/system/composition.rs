use super::accessor::StateView;
use super::config::{ArgumentOrder, CompositionOptions};
use crate::analysis::{DependencyResolver, LabelSets, ResolutionError};
use crate::compute::bytecode::CompiledPlan;
use crate::compute::engine::Engine;
use crate::compute::ledger::{EvalError, Ledger, Value};
use crate::store::{Inputs, Registry, UnitId};
use indexmap::IndexSet;

/// Time and state, in either of the orders integrators use.
#[derive(Debug, Clone, Copy)]
pub enum CallArgs<'a> {
    TimeState(f64, &'a [f64]),
    StateTime(&'a [f64], f64),
}

impl<'a> CallArgs<'a> {
    fn order(&self) -> ArgumentOrder {
        match self {
            CallArgs::TimeState(..) => ArgumentOrder::TimeFirst,
            CallArgs::StateTime(..) => ArgumentOrder::StateFirst,
        }
    }

    fn split(self) -> (f64, &'a [f64]) {
        match self {
            CallArgs::TimeState(t, y) | CallArgs::StateTime(y, t) => (t, y),
        }
    }
}

/// A compiled set of function units, exposed as one derivative function.
///
/// Every evaluation replays the parameter plan, then the derivative plan.
/// Both are fixed at compile time; only the scratch buffers change between calls.
#[derive(Debug)]
pub struct Composition {
    registry: Registry,
    sets: LabelSets,
    param_plan: CompiledPlan,
    state_plan: CompiledPlan,
    options: CompositionOptions,
    ledger: Ledger,
}

impl Composition {
    pub(crate) fn new(
        registry: Registry,
        sets: LabelSets,
        param_plan: CompiledPlan,
        state_plan: CompiledPlan,
        options: CompositionOptions,
    ) -> Self {
        let ledger = Ledger::with_capacity(
            param_plan.output_len,
            state_plan.output_len,
            param_plan.arena_len.max(state_plan.arena_len),
        );
        Self { registry, sets, param_plan, state_plan, options, ledger }
    }

    /// d(state)/dt at `t`, laid out in state order.
    pub fn derivative(&mut self, t: f64, y: &[f64]) -> Result<&[f64], EvalError> {
        let expected = self.sets.states.len();
        if y.len() != expected {
            return Err(EvalError::StateLength { expected, actual: y.len() });
        }
        Engine::run_parameters(&self.param_plan, &mut self.registry, t, &mut self.ledger)?;
        Engine::run_derivatives(&self.state_plan, &mut self.registry, t, y, &mut self.ledger)?;
        Ok(self.ledger.derivatives())
    }

    /// Like [`derivative`](Self::derivative), but checks the arguments come in
    /// the configured order.
    pub fn call(&mut self, args: CallArgs<'_>) -> Result<&[f64], EvalError> {
        let configured = self.options.argument_order;
        if args.order() != configured {
            return Err(EvalError::ArgumentOrder {
                configured: configured.as_str(),
                given: args.order().as_str(),
            });
        }
        let (t, y) = args.split();
        self.derivative(t, y)
    }

    /// A right-hand-side closure for integrators taking `f(t, y)`.
    pub fn rhs(&mut self) -> impl FnMut(f64, &[f64]) -> Result<Vec<f64>, EvalError> + '_ {
        move |t, y| self.derivative(t, y).map(<[f64]>::to_vec)
    }

    /// Only the parameter vector at `t`, in parameter order.
    pub fn parameters(&mut self, t: f64) -> Result<&[f64], EvalError> {
        Engine::run_parameters(&self.param_plan, &mut self.registry, t, &mut self.ledger)?;
        Ok(self.ledger.params())
    }

    pub fn states(&self) -> &IndexSet<String> { &self.sets.states }

    pub fn params(&self) -> &IndexSet<String> { &self.sets.params }

    pub fn label_sets(&self) -> &LabelSets { &self.sets }

    pub fn param_plan(&self) -> &CompiledPlan { &self.param_plan }

    pub fn state_plan(&self) -> &CompiledPlan { &self.state_plan }

    pub fn registry(&self) -> &Registry { &self.registry }

    pub fn options(&self) -> &CompositionOptions { &self.options }

    pub fn state_view<'a>(&'a self, y: &'a [f64]) -> StateView<'a> {
        StateView::new(&self.sets.states, y)
    }

    /// Evaluates every parameter without the compiled plan or the resolver:
    /// sweeps the units in registration order, calling each parameter unit
    /// once its inputs are all known, until a sweep makes no progress. Slow;
    /// meant for cross-checking the plan.
    pub fn reference_parameters(&mut self, t: f64) -> Result<Vec<f64>, EvalError> {
        let n_params = self.sets.params.len();
        let mut values = vec![0.0; n_params];
        let mut known = vec![false; n_params];
        let mut called = vec![false; self.registry.count()];

        loop {
            let mut progress = false;
            for (id, unit) in self.registry.iter_mut() {
                if called[id.index()] || unit.o_param.is_empty() {
                    continue;
                }
                let inputs = unit.i_param.iter()
                    .map(|label| slot(&self.sets.params, label))
                    .collect::<Result<Vec<_>, _>>()?;
                if !inputs.iter().all(|&i| known[i]) {
                    continue;
                }

                let args: Vec<f64> = inputs.iter().map(|&i| values[i]).collect();
                let out = unit.call(&Inputs::params_only(t, &args))
                    .map_err(|source| EvalError::Handler { unit: id, source })?;
                spread(id, &out, &unit.o_param, &self.sets.params, &mut values)?;
                for label in &unit.o_param {
                    known[slot(&self.sets.params, label)?] = true;
                }
                called[id.index()] = true;
                progress = true;
            }
            if !progress {
                break;
            }
        }

        match known.iter().position(|k| !k) {
            None => Ok(values),
            Some(missing) => {
                let label = self.sets.params.get_index(missing).map(String::as_str).unwrap_or_default();
                // Ask the resolver why, for a precise error.
                let err = match DependencyResolver::new(&self.registry).sequence_for(label) {
                    Err(err) => err,
                    Ok(_) => ResolutionError::Unresolved { label: label.to_string() },
                };
                Err(err.into())
            }
        }
    }

    /// Evaluates every derivative unit directly, in registration order, from
    /// `y` and an already computed parameter vector.
    pub fn reference_derivatives(&mut self, t: f64, y: &[f64], params: &[f64]) -> Result<Vec<f64>, EvalError> {
        let expected = self.sets.states.len();
        if y.len() != expected {
            return Err(EvalError::StateLength { expected, actual: y.len() });
        }
        let mut values = vec![0.0; expected];

        for (id, unit) in self.registry.iter_mut() {
            if unit.o_state.is_empty() {
                continue;
            }
            let p = unit.i_param.iter()
                .map(|label| slot(&self.sets.params, label).and_then(|i| lookup(params, i)))
                .collect::<Result<Vec<_>, _>>()?;
            let s = unit.i_state.iter()
                .map(|label| slot(&self.sets.states, label).and_then(|i| lookup(y, i)))
                .collect::<Result<Vec<_>, _>>()?;

            let out = unit.call(&Inputs::new(t, &s, &p))
                .map_err(|source| EvalError::Handler { unit: id, source })?;
            spread(id, &out, &unit.o_state, &self.sets.states, &mut values)?;
        }
        Ok(values)
    }
}

fn slot(set: &IndexSet<String>, label: &str) -> Result<usize, EvalError> {
    set.get_index_of(label)
        .ok_or_else(|| EvalError::MalformedPlan { msg: format!("label '{}' has no slot", label) })
}

fn lookup(values: &[f64], i: usize) -> Result<f64, EvalError> {
    values.get(i).copied()
        .ok_or_else(|| EvalError::MalformedPlan { msg: format!("no value at index {} of {}", i, values.len()) })
}

fn spread(id: UnitId, out: &Value, labels: &[String], set: &IndexSet<String>, values: &mut [f64]) -> Result<(), EvalError> {
    if out.len() != labels.len() {
        return Err(EvalError::Shape { unit: id, expected: labels.len(), actual: out.len() });
    }
    for (k, label) in labels.iter().enumerate() {
        let i = slot(set, label)?;
        values[i] = out.get(k).unwrap_or_default();
    }
    Ok(())
}
