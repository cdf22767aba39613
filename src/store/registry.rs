use super::types::UnitId;
use super::unit::FunctionUnit;

/// Units in registration order. Append-only; `UnitId` is the arena index.
#[derive(Debug, Default)]
pub struct Registry {
    units: Vec<FunctionUnit>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.units.len() }
    pub fn is_empty(&self) -> bool { self.units.is_empty() }

    pub fn add_unit(&mut self, unit: FunctionUnit) -> UnitId {
        let id = UnitId::new(self.units.len());
        self.units.push(unit);
        id
    }

    #[inline(always)]
    pub fn get(&self, id: UnitId) -> Option<&FunctionUnit> {
        self.units.get(id.index())
    }

    #[inline(always)]
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut FunctionUnit> {
        self.units.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &FunctionUnit)> {
        self.units.iter().enumerate().map(|(i, u)| (UnitId::new(i), u))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (UnitId, &mut FunctionUnit)> {
        self.units.iter_mut().enumerate().map(|(i, u)| (UnitId::new(i), u))
    }

    /// Display name: the declared one, or the registration index.
    pub fn label_of(&self, id: UnitId) -> String {
        match self.get(id).and_then(|u| u.name.as_deref()) {
            Some(name) => name.to_string(),
            None => format!("unit {}", id),
        }
    }
}
