use super::composition::Composition;
use super::config::CompositionOptions;
use crate::analysis::{DependencyResolver, LabelSets, ResolutionError, StateOrderMismatch, ValidationError, Validator};
use crate::compute::bytecode::Compiler;
use crate::store::{FunctionUnit, Registry, UnitId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("composition failed {} sanity check(s); no plan was built", .0.len())]
    Sanity(Vec<ValidationError>),
    #[error("explicit state order is not a permutation of the discovered states: {0:?}")]
    StateOrder(StateOrderMismatch),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Collects function units and turns them into a [`Composition`].
///
/// Registration is append-only. `compile` consumes the composer, so a
/// composition is compiled exactly once and cannot drift from its units.
#[derive(Debug, Default)]
pub struct Composer {
    registry: Registry,
    options: CompositionOptions,
}

impl Composer {
    pub fn new() -> Self { Self::default() }

    pub fn with_options(options: CompositionOptions) -> Self {
        Self { registry: Registry::new(), options }
    }

    pub fn from_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = FunctionUnit>,
    {
        let mut composer = Self::new();
        for unit in units {
            composer.register(unit);
        }
        composer
    }

    pub fn register(&mut self, unit: FunctionUnit) -> UnitId {
        self.registry.add_unit(unit)
    }

    /// Labels may still be edited after registration, up to `compile`.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut FunctionUnit> {
        self.registry.get_mut(id)
    }

    pub fn registry(&self) -> &Registry { &self.registry }

    pub fn options(&self) -> &CompositionOptions { &self.options }

    pub fn set_options(&mut self, options: CompositionOptions) {
        self.options = options;
    }

    /// The four label sets as currently discovered, before any explicit state order.
    pub fn label_sets(&self) -> LabelSets {
        LabelSets::discover(&self.registry)
    }

    /// Runs every sanity rule without compiling.
    pub fn check_sanity(&self) -> Result<LabelSets, Vec<ValidationError>> {
        let sets = self.label_sets();
        Validator::new(&self.registry, &sets).validate()?;
        Ok(sets)
    }

    pub fn resolver(&self) -> DependencyResolver<'_> {
        DependencyResolver::new(&self.registry)
    }

    /// Sanity check, state ordering, dependency resolution, then both plans.
    /// Any failure returns before a plan exists.
    pub fn compile(self) -> Result<Composition, CompileError> {
        tracing::debug!(units = self.registry.count(), "compiling composition");

        let mut sets = self.check_sanity().map_err(CompileError::Sanity)?;
        tracing::debug!(
            params = sets.params.len(),
            states = sets.states.len(),
            "label sets discovered"
        );

        if let Some(order) = &self.options.state_order {
            sets.reorder_states(order).map_err(|mismatch| {
                tracing::error!(
                    missing = ?mismatch.missing,
                    unexpected = ?mismatch.unexpected,
                    duplicated = ?mismatch.duplicated,
                    "explicit state order rejected"
                );
                CompileError::StateOrder(mismatch)
            })?;
        }

        let resolver = DependencyResolver::new(&self.registry);
        let compiler = Compiler::new(&self.registry, &sets);
        let param_plan = compiler.compile_parameters(&resolver)?;
        let state_plan = compiler.compile_derivatives()?;

        tracing::info!(
            param_instructions = param_plan.instructions.len(),
            state_instructions = state_plan.instructions.len(),
            arena = param_plan.arena_len.max(state_plan.arena_len),
            "composition compiled"
        );

        Ok(Composition::new(self.registry, sets, param_plan, state_plan, self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ValidationErrorType;
    use crate::store::Inputs;
    use tracing_subscriber::{fmt, EnvFilter};

    /// Surfaces compile diagnostics in test output. Use `RUST_LOG` to override.
    fn init_logging() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sosode_core=debug"));
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    }

    fn decay() -> FunctionUnit {
        FunctionUnit::new(|x: &Inputs| -x.state(0) * x.param(0))
            .with_i_state(["y"])
            .with_i_param(["k"])
            .with_o_state(["y"])
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut composer = Composer::new();
        assert_eq!(composer.register(decay()), UnitId(0));
        assert_eq!(composer.register(FunctionUnit::new(|_: &Inputs| 0.5).with_o_param(["k"])), UnitId(1));
        assert_eq!(composer.registry().count(), 2);
    }

    #[test]
    fn test_labels_editable_until_compile() {
        let mut composer = Composer::from_units([decay(), FunctionUnit::new(|_: &Inputs| 0.5)]);
        assert!(composer.check_sanity().is_err());
        composer.unit_mut(UnitId(1)).unwrap().set_o_param(["k"]);
        let sets = composer.check_sanity().unwrap();
        assert_eq!(sets.param_slot("k"), Some(0));
    }

    #[test]
    fn test_compile_reports_every_violation() {
        init_logging();
        let mut composer = Composer::new();
        composer.register(decay());
        composer.register(FunctionUnit::new(|_: &Inputs| 0.0));
        let err = composer.compile().unwrap_err();
        match err {
            CompileError::Sanity(errors) => {
                let kinds: Vec<_> = errors.iter().map(|e| e.error_type).collect();
                assert_eq!(kinds, [ValidationErrorType::NoOutputs, ValidationErrorType::UnresolvedInput]);
            }
            other => panic!("expected sanity failure, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_rejects_bad_state_order() {
        init_logging();
        let mut composer = Composer::with_options(CompositionOptions::default().with_state_order(["y", "z"]));
        composer.register(decay());
        composer.register(FunctionUnit::new(|_: &Inputs| 0.5).with_o_param(["k"]));
        let err = composer.compile().unwrap_err();
        assert_eq!(
            err,
            CompileError::StateOrder(StateOrderMismatch {
                missing: vec![],
                unexpected: vec!["z".into()],
                duplicated: vec![],
            })
        );
    }

    #[test]
    fn test_compile_rejects_parameter_cycle() {
        init_logging();
        let mut composer = Composer::new();
        composer.register(decay());
        composer.register(FunctionUnit::new(|x: &Inputs| x.param(0)).with_i_param(["j"]).with_o_param(["k"]));
        composer.register(FunctionUnit::new(|x: &Inputs| x.param(0)).with_i_param(["k"]).with_o_param(["j"]));
        assert!(composer.check_sanity().is_ok());

        let err = composer.compile().unwrap_err();
        assert!(matches!(err, CompileError::Resolution(ResolutionError::Cycle { .. })));
        assert!(err.to_string().contains("depends on itself"));
    }
}
