use crate::analysis::LabelSets;
use crate::compute::bytecode::{Block, CompiledPlan, Instruction, PlanKind};
use crate::store::Registry;
use std::fmt::Write;

/// One block per registered unit, with its four label contracts.
pub fn describe_units(registry: &Registry) -> String {
    let mut output = String::new();
    for (id, unit) in registry.iter() {
        let _ = writeln!(output, "-> {}:", registry.label_of(id));
        let _ = writeln!(output, "     input states: {:?}", unit.i_state);
        let _ = writeln!(output, "     input params: {:?}", unit.i_param);
        let _ = writeln!(output, "    output states: {:?}", unit.o_state);
        let _ = writeln!(output, "    output params: {:?}", unit.o_param);
    }
    output
}

/// Disassembly of a plan, with slots resolved back to labels.
pub fn format_plan(plan: &CompiledPlan, sets: &LabelSets, registry: &Registry) -> String {
    let listing = Listing { plan, sets, registry };
    let mut output = String::new();

    let title = match plan.kind {
        PlanKind::Parameters => "PARAMETER PLAN",
        PlanKind::Derivatives => "DERIVATIVE PLAN",
    };
    let _ = writeln!(
        output,
        "{} ({} instructions, {} outputs, arena {}):",
        title, plan.instructions.len(), plan.output_len, plan.arena_len
    );
    let _ = writeln!(output, "--------------------------------------------------");

    for (pc, ins) in plan.instructions.iter().enumerate() {
        let _ = writeln!(output, "{:>4}  {}", pc, listing.format_instruction(ins));
    }
    output
}

struct Listing<'a> {
    plan: &'a CompiledPlan,
    sets: &'a LabelSets,
    registry: &'a Registry,
}

impl<'a> Listing<'a> {
    fn format_instruction(&self, ins: &Instruction) -> String {
        match *ins {
            Instruction::Begin { block, span } => {
                let block = match block {
                    Block::Args => "args",
                    Block::Params => "params",
                    Block::State => "state",
                };
                format!("begin   {} [{}..{})", block, span.start, span.end())
            }
            Instruction::LoadParam { slot, dest } => {
                format!("load    param '{}' -> a{}", name(&self.sets.params, slot), dest)
            }
            Instruction::LoadState { index, dest } => {
                format!("load    state '{}' -> a{}", name(&self.sets.states, index), dest)
            }
            Instruction::Call { unit, params, state } => {
                let mut line = format!("call    {}", self.registry.label_of(unit));
                if params.len > 0 {
                    let _ = write!(line, " params=a[{}..{})", params.start, params.end());
                }
                if state.len > 0 {
                    let _ = write!(line, " state=a[{}..{})", state.start, state.end());
                }
                line
            }
            Instruction::Store { count, .. } => format!("store   {} value(s)", count),
            Instruction::StoreScalar { slot } => format!("  ->    '{}'", self.output_name(slot)),
            Instruction::StoreElement { element, slot } => {
                format!("  ->    [{}] '{}'", element, self.output_name(slot))
            }
        }
    }

    fn output_name(&self, slot: u32) -> &'a str {
        let sets: &'a LabelSets = self.sets;
        match self.plan.kind {
            PlanKind::Parameters => name(&sets.params, slot),
            PlanKind::Derivatives => name(&sets.states, slot),
        }
    }
}

fn name(set: &indexmap::IndexSet<String>, idx: u32) -> &str {
    set.get_index(idx as usize).map(String::as_str).unwrap_or("?")
}
