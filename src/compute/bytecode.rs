use crate::analysis::{DependencyResolver, LabelSets, ResolutionError};
use crate::store::{Registry, UnitId};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A window into the plan's argument arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArgSpan {
    pub start: u32,
    pub len: u32,
}

impl ArgSpan {
    /// One past the last arena index. Widened so a hand-written span cannot overflow.
    #[inline(always)]
    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.len)
    }

    /// `None` when the window does not fit the address space.
    #[inline(always)]
    pub fn range(&self) -> Option<Range<usize>> {
        let start = usize::try_from(self.start).ok()?;
        let end = start.checked_add(usize::try_from(self.len).ok()?)?;
        Some(start..end)
    }
}

/// Which argument block a `Begin` opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    /// Parameter arguments of a parameter-producing unit.
    Args,
    /// Parameter arguments of a derivative unit.
    Params,
    /// State arguments of a derivative unit.
    State,
}

/// How a result is spread over the output buffer. Decided at compile time
/// from the declared output count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreShape {
    Scalar,
    Sequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Opens (and zeroes) the arena window the following loads fill.
    Begin { block: Block, span: ArgSpan },
    /// Copies a parameter into the arena. The parameter plan reads the
    /// parameters it is producing; the derivative plan reads the finished ones.
    LoadParam { slot: u32, dest: u32 },
    /// Copies an entry of the caller's state vector into the arena.
    LoadState { index: u32, dest: u32 },
    /// Invokes a unit on its own argument windows; the result becomes pending.
    Call { unit: UnitId, params: ArgSpan, state: ArgSpan },
    /// Checks the pending result against the declared output count.
    Store { count: u32, shape: StoreShape },
    /// Writes a single-element result into the output buffer.
    StoreScalar { slot: u32 },
    /// Writes one element of a sequence result into the output buffer.
    StoreElement { element: u32, slot: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanKind {
    Parameters,
    Derivatives,
}

/// Immutable, flattened replay script. Built once, executed on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPlan {
    pub kind: PlanKind,
    pub instructions: Vec<Instruction>,
    /// Length of the produced vector.
    pub output_len: usize,
    /// Total size of the argument arena; every call owns a disjoint window.
    pub arena_len: usize,
}

impl CompiledPlan {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Units in the order they are called.
    pub fn call_order(&self) -> Vec<UnitId> {
        self.instructions.iter()
            .filter_map(|ins| match ins {
                Instruction::Call { unit, .. } => Some(*unit),
                _ => None,
            })
            .collect()
    }
}

pub struct Compiler<'a> {
    registry: &'a Registry,
    sets: &'a LabelSets,
}

/// Appends instructions while handing out arena windows.
struct Emitter {
    code: Vec<Instruction>,
    arena: u32,
}

impl Emitter {
    fn new() -> Self { Self { code: Vec::new(), arena: 0 } }

    fn open(&mut self, block: Block, len: usize) -> ArgSpan {
        let span = ArgSpan { start: self.arena, len: len as u32 };
        self.arena += len as u32;
        self.code.push(Instruction::Begin { block, span });
        span
    }

    fn store(&mut self, slots: &[u32]) {
        let count = slots.len() as u32;
        if count == 1 {
            self.code.push(Instruction::Store { count, shape: StoreShape::Scalar });
            self.code.push(Instruction::StoreScalar { slot: slots[0] });
        } else {
            self.code.push(Instruction::Store { count, shape: StoreShape::Sequence });
            for (element, &slot) in slots.iter().enumerate() {
                self.code.push(Instruction::StoreElement { element: element as u32, slot });
            }
        }
    }

    fn finish(self, kind: PlanKind, output_len: usize) -> CompiledPlan {
        CompiledPlan { kind, instructions: self.code, output_len, arena_len: self.arena as usize }
    }
}

impl<'a> Compiler<'a> {
    /// `sets` must have been discovered from `registry` and have passed the
    /// sanity rules, so every referenced label has a slot.
    pub fn new(registry: &'a Registry, sets: &'a LabelSets) -> Self {
        Self { registry, sets }
    }

    /// Builds the plan producing the full parameter vector.
    ///
    /// Parameters are visited in discovered order. For the first one not yet
    /// scheduled, its producer chain is resolved and replayed dependency-first;
    /// units already called for an earlier parameter are skipped, and so are
    /// parameters an earlier multi-output unit already produced.
    pub fn compile_parameters(&self, resolver: &DependencyResolver<'_>) -> Result<CompiledPlan, ResolutionError> {
        let n_params = self.sets.params.len();
        let mut scheduled = vec![false; n_params];
        let mut called = vec![false; self.registry.count()];
        let mut remaining = n_params;
        let mut emit = Emitter::new();

        for (idx, label) in self.sets.params.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            if scheduled[idx] {
                continue;
            }

            let mut sequence = resolver.sequence_for(label)?;
            sequence.reverse();
            tracing::debug!(param = label.as_str(), units = ?sequence, "resolved parameter");

            for unit_id in sequence {
                if called[unit_id.index()] {
                    continue;
                }
                let unit = self.unit(unit_id, label)?;

                let span = emit.open(Block::Args, unit.i_param.len());
                for (k, input) in unit.i_param.iter().enumerate() {
                    let slot = self.param_slot(input)?;
                    emit.code.push(Instruction::LoadParam { slot, dest: span.start + k as u32 });
                }
                emit.code.push(Instruction::Call { unit: unit_id, params: span, state: ArgSpan::default() });
                called[unit_id.index()] = true;

                let mut slots = Vec::with_capacity(unit.o_param.len());
                for output in &unit.o_param {
                    let slot = self.param_slot(output)?;
                    if !scheduled[slot as usize] {
                        scheduled[slot as usize] = true;
                        remaining -= 1;
                    }
                    slots.push(slot);
                }
                emit.store(&slots);

                if remaining == 0 {
                    break;
                }
            }
        }

        Ok(emit.finish(PlanKind::Parameters, n_params))
    }

    /// Builds the plan producing the derivative vector. Derivative units are
    /// independent of each other, so they run once each in registration order.
    pub fn compile_derivatives(&self) -> Result<CompiledPlan, ResolutionError> {
        let mut emit = Emitter::new();

        for (unit_id, unit) in self.registry.iter() {
            if unit.o_state.is_empty() {
                continue;
            }

            let params = emit.open(Block::Params, unit.i_param.len());
            for (k, input) in unit.i_param.iter().enumerate() {
                let slot = self.param_slot(input)?;
                emit.code.push(Instruction::LoadParam { slot, dest: params.start + k as u32 });
            }

            let state = emit.open(Block::State, unit.i_state.len());
            for (k, input) in unit.i_state.iter().enumerate() {
                let index = self.state_index(input)?;
                emit.code.push(Instruction::LoadState { index, dest: state.start + k as u32 });
            }

            emit.code.push(Instruction::Call { unit: unit_id, params, state });

            let slots = unit.o_state.iter()
                .map(|output| self.state_index(output))
                .collect::<Result<Vec<_>, _>>()?;
            emit.store(&slots);
        }

        Ok(emit.finish(PlanKind::Derivatives, self.sets.states.len()))
    }

    fn unit(&self, id: UnitId, label: &str) -> Result<&'a crate::store::FunctionUnit, ResolutionError> {
        self.registry.get(id).ok_or_else(|| ResolutionError::Unresolved { label: label.to_string() })
    }

    fn param_slot(&self, label: &str) -> Result<u32, ResolutionError> {
        self.sets.param_slot(label)
            .map(|i| i as u32)
            .ok_or_else(|| ResolutionError::Unresolved { label: label.to_string() })
    }

    fn state_index(&self, label: &str) -> Result<u32, ResolutionError> {
        self.sets.state_index(label)
            .map(|i| i as u32)
            .ok_or_else(|| ResolutionError::Unresolved { label: label.to_string() })
    }
}
