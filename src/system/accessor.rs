use indexmap::IndexSet;

/// Named access into a state vector laid out in composition order.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    states: &'a IndexSet<String>,
    y: &'a [f64],
}

impl<'a> StateView<'a> {
    pub(crate) fn new(states: &'a IndexSet<String>, y: &'a [f64]) -> Self {
        Self { states, y }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.states.get_index_of(label).and_then(|i| self.y.get(i).copied())
    }

    /// All requested entries, in the requested order; `None` if any label is unknown.
    pub fn pick(&self, labels: &[&str]) -> Option<Vec<f64>> {
        labels.iter().map(|l| self.get(l)).collect()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(String::as_str)
    }
}
