//! Options fixed when a composition is compiled.

use serde::{Deserialize, Serialize};

/// Argument order the composition expects from its integrator.
///
/// # Variants
/// * `TimeFirst` - `(t, y)`, the default
/// * `StateFirst` - `(y, t)`, as some integrators call their right-hand side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentOrder {
    #[default]
    TimeFirst,
    StateFirst,
}

impl ArgumentOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentOrder::TimeFirst => "(t, y)",
            ArgumentOrder::StateFirst => "(y, t)",
        }
    }
}

/// Compile-time options.
///
/// # Fields
/// * `argument_order` - How the integrator passes time and state (optional, defaults to `time_first`)
/// * `state_order` - Explicit state vector layout; must be a permutation of the
///   discovered states (optional, defaults to first-seen order)
///
/// # Example
/// ```json
/// { "argument_order": "state_first", "state_order": ["v", "x"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionOptions {
    #[serde(default)]
    pub argument_order: ArgumentOrder,
    #[serde(default)]
    pub state_order: Option<Vec<String>>,
}

impl CompositionOptions {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_argument_order(mut self, order: ArgumentOrder) -> Self {
        self.argument_order = order;
        self
    }

    pub fn with_state_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state_order = Some(order.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let opts = CompositionOptions::from_json("{}").unwrap();
        assert_eq!(opts, CompositionOptions::default());
        assert_eq!(opts.argument_order, ArgumentOrder::TimeFirst);
        assert!(opts.state_order.is_none());
    }

    #[test]
    fn test_full_json() {
        let opts = CompositionOptions::from_json(r#"{ "argument_order": "state_first", "state_order": ["v", "x"] }"#).unwrap();
        assert_eq!(opts, CompositionOptions::default().with_argument_order(ArgumentOrder::StateFirst).with_state_order(["v", "x"]));
    }

    #[test]
    fn test_unknown_order_is_rejected() {
        assert!(CompositionOptions::from_json(r#"{ "argument_order": "sideways" }"#).is_err());
    }
}
