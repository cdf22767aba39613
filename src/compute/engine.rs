use crate::compute::bytecode::{CompiledPlan, Instruction, PlanKind};
use crate::compute::ledger::{EvalError, Ledger, Value};
use crate::store::{Inputs, Registry, UnitId};

pub struct Engine;

impl Engine {
    /// Replays a parameter plan; the result is left in `ledger.params()`.
    pub fn run_parameters(
        plan: &CompiledPlan,
        registry: &mut Registry,
        t: f64,
        ledger: &mut Ledger,
    ) -> Result<(), EvalError> {
        Self::expect_kind(plan, PlanKind::Parameters)?;
        ledger.reset_params(plan.output_len, plan.arena_len);
        let (out, args) = ledger.params_parts();
        Self::replay(plan, registry, t, &[], None, out, args)
    }

    /// Replays a derivative plan against `state` and the parameters already in
    /// the ledger; the result is left in `ledger.derivatives()`.
    pub fn run_derivatives(
        plan: &CompiledPlan,
        registry: &mut Registry,
        t: f64,
        state: &[f64],
        ledger: &mut Ledger,
    ) -> Result<(), EvalError> {
        Self::expect_kind(plan, PlanKind::Derivatives)?;
        ledger.reset_derivatives(plan.output_len, plan.arena_len);
        let (params, out, args) = ledger.derivative_parts();
        Self::replay(plan, registry, t, state, Some(params), out, args)
    }

    /// Executes the instructions strictly in order. Every index is bounds
    /// checked, so a hand-edited or stale plan fails with `MalformedPlan`
    /// instead of panicking.
    fn replay(
        plan: &CompiledPlan,
        registry: &mut Registry,
        t: f64,
        state: &[f64],
        params: Option<&[f64]>,
        out: &mut [f64],
        args: &mut [f64],
    ) -> Result<(), EvalError> {
        tracing::trace!(kind = ?plan.kind, t, "replaying plan");
        let mut pending: Option<(UnitId, Value)> = None;

        for (pc, ins) in plan.instructions.iter().enumerate() {
            match *ins {
                Instruction::Begin { span, .. } => {
                    let window = match span.range() {
                        Some(r) => args.get_mut(r),
                        None => None,
                    };
                    window.ok_or_else(|| malformed(pc, "argument window outside the arena"))?.fill(0.0);
                }
                Instruction::LoadParam { slot, dest } => {
                    // While producing parameters, inputs come from the buffer being filled.
                    let source: &[f64] = match params {
                        Some(p) => p,
                        None => &*out,
                    };
                    let value = *source.get(slot as usize)
                        .ok_or_else(|| malformed(pc, "parameter slot out of range"))?;
                    *args.get_mut(dest as usize).ok_or_else(|| malformed(pc, "load outside the arena"))? = value;
                }
                Instruction::LoadState { index, dest } => {
                    let value = *state.get(index as usize)
                        .ok_or_else(|| malformed(pc, "state index out of range"))?;
                    *args.get_mut(dest as usize).ok_or_else(|| malformed(pc, "load outside the arena"))? = value;
                }
                Instruction::Call { unit, params: p, state: s } => {
                    let inputs = Inputs::new(
                        t,
                        s.range().and_then(|r| args.get(r))
                            .ok_or_else(|| malformed(pc, "state window outside the arena"))?,
                        p.range().and_then(|r| args.get(r))
                            .ok_or_else(|| malformed(pc, "parameter window outside the arena"))?,
                    );
                    let handler = registry.get_mut(unit).ok_or_else(|| malformed(pc, "unknown unit"))?;
                    let value = handler.call(&inputs).map_err(|source| EvalError::Handler { unit, source })?;
                    pending = Some((unit, value));
                }
                Instruction::Store { count, .. } => {
                    let (unit, value) = pending.as_ref().ok_or_else(|| malformed(pc, "store without a call"))?;
                    if value.len() != count as usize {
                        return Err(EvalError::Shape { unit: *unit, expected: count as usize, actual: value.len() });
                    }
                }
                Instruction::StoreScalar { slot } => {
                    Self::write(pc, &pending, 0, slot, out)?;
                }
                Instruction::StoreElement { element, slot } => {
                    Self::write(pc, &pending, element, slot, out)?;
                }
            }
        }

        Ok(())
    }

    #[inline]
    fn write(
        pc: usize,
        pending: &Option<(UnitId, Value)>,
        element: u32,
        slot: u32,
        out: &mut [f64],
    ) -> Result<(), EvalError> {
        let (unit, value) = pending.as_ref().ok_or_else(|| malformed(pc, "store without a call"))?;
        let v = value.get(element as usize).ok_or(EvalError::Shape {
            unit: *unit,
            expected: element as usize + 1,
            actual: value.len(),
        })?;
        *out.get_mut(slot as usize).ok_or_else(|| malformed(pc, "output slot out of range"))? = v;
        Ok(())
    }

    fn expect_kind(plan: &CompiledPlan, kind: PlanKind) -> Result<(), EvalError> {
        if plan.kind == kind {
            Ok(())
        } else {
            Err(EvalError::MalformedPlan { msg: format!("expected a {:?} plan, got {:?}", kind, plan.kind) })
        }
    }
}

fn malformed(pc: usize, what: &str) -> EvalError {
    EvalError::MalformedPlan { msg: format!("instruction {}: {}", pc, what) }
}
