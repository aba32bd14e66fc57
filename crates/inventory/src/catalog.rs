//! Units of measure and warehouse sections offered when creating items.

use serde::{Deserialize, Serialize};

use cashflow_core::{
    DomainError, DomainResult, Entity, SectionId, UnitId, ensure_not_blank, find_by_id,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUnit {
    pub id: UnitId,
    /// e.g. "Kilogramos"
    pub name: String,
    /// e.g. "kg"
    pub abbreviation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySection {
    pub id: SectionId,
    pub name: String,
}

impl Entity for InventoryUnit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for InventorySection {
    type Id = SectionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Units and sections, in insertion order.
///
/// Names are unique case-insensitively. Deleting an entry does not touch items
/// that already reference it: items store the abbreviation / name as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    units: Vec<InventoryUnit>,
    sections: Vec<InventorySection>,
}

impl Catalog {
    pub fn new(units: Vec<InventoryUnit>, sections: Vec<InventorySection>) -> Self {
        Self { units, sections }
    }

    pub fn units(&self) -> &[InventoryUnit] {
        &self.units
    }

    pub fn sections(&self) -> &[InventorySection] {
        &self.sections
    }

    pub fn into_parts(self) -> (Vec<InventoryUnit>, Vec<InventorySection>) {
        (self.units, self.sections)
    }

    pub fn add_unit(
        &mut self,
        id: UnitId,
        name: &str,
        abbreviation: &str,
    ) -> DomainResult<&InventoryUnit> {
        let name = ensure_not_blank(name, "unit name")?;
        let abbreviation = ensure_not_blank(abbreviation, "abbreviation")?;
        if self.units.iter().any(|u| u.name.to_lowercase() == name.to_lowercase()) {
            return Err(DomainError::conflict(format!("unit '{name}' already exists")));
        }
        self.units.push(InventoryUnit {
            id,
            name,
            abbreviation,
        });
        Ok(&self.units[self.units.len() - 1])
    }

    pub fn delete_unit(&mut self, id: UnitId) -> DomainResult<InventoryUnit> {
        let pos = self
            .units
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| DomainError::not_found(format!("unit {id}")))?;
        Ok(self.units.remove(pos))
    }

    pub fn add_section(&mut self, id: SectionId, name: &str) -> DomainResult<&InventorySection> {
        let name = ensure_not_blank(name, "section name")?;
        if self.sections.iter().any(|s| s.name.to_lowercase() == name.to_lowercase()) {
            return Err(DomainError::conflict(format!("section '{name}' already exists")));
        }
        self.sections.push(InventorySection { id, name });
        Ok(&self.sections[self.sections.len() - 1])
    }

    pub fn delete_section(&mut self, id: SectionId) -> DomainResult<InventorySection> {
        let pos = self
            .sections
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DomainError::not_found(format!("section {id}")))?;
        Ok(self.sections.remove(pos))
    }

    pub fn unit(&self, id: UnitId) -> Option<&InventoryUnit> {
        find_by_id(&self.units, &id)
    }

    pub fn section(&self, id: SectionId) -> Option<&InventorySection> {
        find_by_id(&self.sections, &id)
    }
}
