//! The sanity verifier that runs every structural rule over the registered units.
use super::error::{ValidationError, ValidationErrorType};
use super::sets::LabelSets;
use crate::store::{Registry, UnitId};

/// Runs all sanity rules against a registry, like a linter: every rule runs
/// even after an earlier one failed, so a single pass reports every problem.
pub struct Validator<'a> {
    registry: &'a Registry,
    sets: &'a LabelSets,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a Registry, sets: &'a LabelSets) -> Self {
        Self { registry, sets }
    }

    /// # Returns
    /// - `Ok(())` if the composition is well formed.
    /// - `Err(Vec<ValidationError>)` with every violation, in rule order.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        self.unique_producers(&mut errors);
        self.units_have_outputs(&mut errors);
        self.inputs_are_produced(&mut errors);
        self.outputs_not_mixed(&mut errors);
        self.states_not_empty(&mut errors);
        self.labels_disjoint(&mut errors);

        for err in &errors {
            tracing::error!(
                rule = ?err.error_type,
                unit = err.unit.map(|u| u.index()),
                label = err.label.as_deref(),
                "{}", err
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Rule 1: each output label has exactly one producer.
    fn unique_producers(&self, errors: &mut Vec<ValidationError>) {
        for label in &self.sets.outputs {
            let producers: Vec<UnitId> = self.registry.iter()
                .filter(|(_, unit)| unit.produces(label))
                .map(|(id, _)| id)
                .collect();

            if producers.len() != 1 {
                let names: Vec<String> = producers.iter().map(|id| self.registry.label_of(*id)).collect();
                let msg = format!(
                    "output '{}' is calculated by {} functions ({}).",
                    label, producers.len(), names.join(", ")
                );
                let mut err = ValidationError::new(ValidationErrorType::DuplicateProducer, msg).for_label(label.as_str());
                if let Some(&second) = producers.get(1) {
                    err = err.at_unit(second);
                }
                errors.push(err);
            }
        }
    }

    /// Rule 2: every unit calculates at least one output.
    fn units_have_outputs(&self, errors: &mut Vec<ValidationError>) {
        for (id, unit) in self.registry.iter() {
            if unit.output_count() == 0 {
                let msg = format!("{} does not calculate any output.", self.registry.label_of(id));
                errors.push(ValidationError::new(ValidationErrorType::NoOutputs, msg).at_unit(id));
            }
        }
    }

    /// Rule 3: every input is an output of some unit.
    fn inputs_are_produced(&self, errors: &mut Vec<ValidationError>) {
        for label in &self.sets.inputs {
            if !self.sets.outputs.contains(label) {
                let msg = format!("input '{}' is not calculated by any function.", label);
                errors.push(ValidationError::new(ValidationErrorType::UnresolvedInput, msg).for_label(label.as_str()));
            }
        }
    }

    /// Rule 4: derivative units never calculate parameters, and vice versa.
    fn outputs_not_mixed(&self, errors: &mut Vec<ValidationError>) {
        for (id, unit) in self.registry.iter() {
            if !unit.o_state.is_empty() && !unit.o_param.is_empty() {
                let msg = format!("{} calculates derivatives AND parameters.", self.registry.label_of(id));
                errors.push(ValidationError::new(ValidationErrorType::MixedOutputs, msg).at_unit(id));
            }
        }
    }

    /// Rule 5: at least one state to integrate.
    fn states_not_empty(&self, errors: &mut Vec<ValidationError>) {
        if self.sets.states.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorType::NoStates,
                "there is no derivative of states to integrate.",
            ));
        }
    }

    /// Rule 6: state and parameter namespaces do not overlap.
    fn labels_disjoint(&self, errors: &mut Vec<ValidationError>) {
        for label in self.sets.states.intersection(&self.sets.params) {
            let msg = format!("label '{}' is used both as a state and as a parameter.", label);
            errors.push(ValidationError::new(ValidationErrorType::LabelCollision, msg).for_label(label.as_str()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FunctionUnit, Inputs};
    use rstest::rstest;

    /// The predator/prey layout: two derivative units, one parameter unit.
    fn base_registry() -> Registry {
        let mut reg = Registry::new();
        reg.add_unit(
            FunctionUnit::new(|_: &Inputs| [0.0, 0.0])
                .with_i_state(["y1", "y2", "y3", "y4"])
                .with_i_param(["theta1", "theta2"])
                .with_o_state(["y1", "y3"]),
        );
        reg.add_unit(
            FunctionUnit::new(|_: &Inputs| [0.0, 0.0])
                .with_i_state(["y1", "y2", "y3", "y4"])
                .with_o_state(["y2", "y4"]),
        );
        reg.add_unit(FunctionUnit::new(|_: &Inputs| [2.0, 4.0]).with_o_param(["theta1", "theta2"]));
        reg
    }

    fn run(reg: &Registry) -> Result<(), Vec<ValidationError>> {
        let sets = LabelSets::discover(reg);
        Validator::new(reg, &sets).validate()
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ValidationErrorType> {
        errors.iter().map(|e| e.error_type).collect()
    }

    #[test]
    fn test_valid_composition_passes() {
        assert!(run(&base_registry()).is_ok());
    }

    #[test]
    fn test_duplicate_producer() {
        let mut reg = base_registry();
        reg.get_mut(UnitId(0)).unwrap().set_o_state(["y1", "y3", "y2"]);
        let errors = run(&reg).unwrap_err();
        assert_eq!(kinds(&errors), [ValidationErrorType::DuplicateProducer]);
        assert_eq!(errors[0].label.as_deref(), Some("y2"));
        assert_eq!(errors[0].unit, Some(UnitId(1)));
    }

    #[test]
    fn test_no_outputs_also_reports_unresolved_inputs() {
        let mut reg = base_registry();
        reg.get_mut(UnitId(0)).unwrap().set_o_state(Vec::<String>::new());
        let errors = run(&reg).unwrap_err();
        assert_eq!(
            kinds(&errors),
            [
                ValidationErrorType::NoOutputs,
                ValidationErrorType::UnresolvedInput,
                ValidationErrorType::UnresolvedInput,
            ]
        );
        assert_eq!(errors[0].unit, Some(UnitId(0)));
        assert_eq!(errors[1].label.as_deref(), Some("y1"));
        assert_eq!(errors[2].label.as_deref(), Some("y3"));
    }

    #[test]
    fn test_mixed_outputs() {
        let mut reg = base_registry();
        reg.get_mut(UnitId(1)).unwrap().set_o_param(["extra"]);
        let errors = run(&reg).unwrap_err();
        assert_eq!(kinds(&errors), [ValidationErrorType::MixedOutputs]);
        assert_eq!(errors[0].unit, Some(UnitId(1)));
    }

    #[test]
    fn test_no_states() {
        let mut reg = Registry::new();
        reg.add_unit(FunctionUnit::new(|x: &Inputs| x.t).with_o_param(["p"]));
        let errors = run(&reg).unwrap_err();
        assert_eq!(kinds(&errors), [ValidationErrorType::NoStates]);
    }

    #[test]
    fn test_state_and_param_with_same_label() {
        let mut reg = Registry::new();
        reg.add_unit(FunctionUnit::new(|x: &Inputs| x.state(0)).with_i_state(["v"]).with_i_param(["k"]).with_o_state(["v"]));
        reg.add_unit(FunctionUnit::new(|x: &Inputs| x.t).with_o_param(["k"]));
        reg.add_unit(FunctionUnit::new(|x: &Inputs| x.t).with_o_param(["v2"]));
        assert!(run(&reg).is_ok());

        reg.get_mut(UnitId(2)).unwrap().set_i_param(["v"]);
        let errors = run(&reg).unwrap_err();
        assert_eq!(kinds(&errors), [ValidationErrorType::LabelCollision]);
        assert_eq!(errors[0].label.as_deref(), Some("v"));
    }

    #[rstest]
    #[case::all_rules_at_once(true)]
    #[case::single_rule(false)]
    fn test_every_rule_runs_after_a_failure(#[case] break_more: bool) {
        let mut reg = base_registry();
        reg.get_mut(UnitId(0)).unwrap().set_o_param(["y1", "y3"]);
        if break_more {
            reg.add_unit(FunctionUnit::new(|_: &Inputs| 0.0));
        }
        let errors = run(&reg).unwrap_err();
        let found = kinds(&errors);
        assert!(found.contains(&ValidationErrorType::MixedOutputs));
        assert!(found.contains(&ValidationErrorType::LabelCollision));
        assert_eq!(found.contains(&ValidationErrorType::NoOutputs), break_more);
    }
}
