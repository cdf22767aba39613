use crate::compute::bytecode::{CompiledPlan, Instruction, StoreShape};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrafficStats {
    /// Values copied from the parameter buffer into the arena.
    pub param_loads: usize,
    /// Values copied from the caller's state vector into the arena.
    pub state_loads: usize,
    /// Single-element results written out.
    pub scalar_stores: usize,
    /// Elements written out of sequence results.
    pub element_stores: usize,
}

/// Static shape of a compiled plan: what one replay costs before any handler runs.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub total_instructions: usize,
    pub op_counts: HashMap<String, usize>,
    pub calls: usize,
    pub traffic: TrafficStats,
    /// Calls whose result is spread over several slots.
    pub sequence_results: usize,
    pub arena_len: usize,
    /// Average number of arguments a call receives. Lower means cheaper setup.
    pub avg_call_width: f64,
}

impl PlanReport {
    pub fn analyze(plan: &CompiledPlan) -> Self {
        let mut op_counts = HashMap::new();
        let mut traffic = TrafficStats::default();
        let mut calls = 0;
        let mut sequence_results = 0;
        let mut call_width: usize = 0;

        for ins in &plan.instructions {
            let op_name = match ins {
                Instruction::Begin { .. } => "Begin",
                Instruction::LoadParam { .. } => {
                    traffic.param_loads += 1;
                    "LoadParam"
                }
                Instruction::LoadState { .. } => {
                    traffic.state_loads += 1;
                    "LoadState"
                }
                Instruction::Call { params, state, .. } => {
                    calls += 1;
                    call_width += (params.len + state.len) as usize;
                    "Call"
                }
                Instruction::Store { shape, .. } => {
                    if *shape == StoreShape::Sequence {
                        sequence_results += 1;
                    }
                    "Store"
                }
                Instruction::StoreScalar { .. } => {
                    traffic.scalar_stores += 1;
                    "StoreScalar"
                }
                Instruction::StoreElement { .. } => {
                    traffic.element_stores += 1;
                    "StoreElement"
                }
            };
            *op_counts.entry(op_name.to_string()).or_insert(0) += 1;
        }

        Self {
            total_instructions: plan.instructions.len(),
            op_counts,
            calls,
            traffic,
            sequence_results,
            arena_len: plan.arena_len,
            avg_call_width: if calls > 0 { call_width as f64 / calls as f64 } else { 0.0 },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DependencyResolver, LabelSets};
    use crate::compute::bytecode::Compiler;
    use crate::store::{FunctionUnit, Inputs, Registry};

    fn plans() -> (CompiledPlan, CompiledPlan) {
        let mut reg = Registry::new();
        reg.add_unit(FunctionUnit::new(|x: &Inputs| [x.state(0), x.state(1) * x.param(0)])
            .with_i_state(["x", "v"]).with_i_param(["k"]).with_o_state(["x", "v"]));
        reg.add_unit(FunctionUnit::new(|x: &Inputs| x.param(0) * 2.0).with_i_param(["m"]).with_o_param(["k"]));
        reg.add_unit(FunctionUnit::new(|x: &Inputs| x.t).with_o_param(["m"]));
        let sets = LabelSets::discover(&reg);
        let compiler = Compiler::new(&reg, &sets);
        let params = compiler.compile_parameters(&DependencyResolver::new(&reg)).unwrap();
        let states = compiler.compile_derivatives().unwrap();
        (params, states)
    }

    #[test]
    fn test_parameter_plan_report() {
        let (params, _) = plans();
        let report = PlanReport::analyze(&params);
        assert_eq!(report.calls, 2);
        assert_eq!(report.traffic.param_loads, 1);
        assert_eq!(report.traffic.state_loads, 0);
        assert_eq!(report.traffic.scalar_stores, 2);
        assert_eq!(report.sequence_results, 0);
        assert_eq!(report.arena_len, 1);
        assert_eq!(report.avg_call_width, 0.5);
        assert_eq!(report.op_counts["Call"], 2);
        assert_eq!(report.total_instructions, params.instructions.len());
    }

    #[test]
    fn test_derivative_plan_report() {
        let (_, states) = plans();
        let report = PlanReport::analyze(&states);
        assert_eq!(report.calls, 1);
        assert_eq!(report.traffic.state_loads, 2);
        assert_eq!(report.traffic.element_stores, 2);
        assert_eq!(report.sequence_results, 1);
        assert_eq!(report.avg_call_width, 3.0);
        assert!(report.to_json().unwrap().contains("\"calls\": 1"));
    }
}
