//! In-memory stakeholder store keyed by DID.

use std::collections::HashMap;

use tracing::debug;
use trustmesh_types::{Did, StakeholderKind};

use crate::stakeholder::{Stakeholder, StakeholderRecord};
use crate::{EvaluationError, Result};

/// Registered stakeholders in registration order
#[derive(Debug, Clone, Default)]
pub struct StakeholderRegistry {
    stakeholders: Vec<Stakeholder>,
    index: HashMap<Did, usize>,
}

impl StakeholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from persisted rows, rejecting the batch on the first bad row
    pub fn from_records<'a, I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a StakeholderRecord>,
    {
        let mut registry = Self::new();
        for record in records {
            registry.register(Stakeholder::from_record(record)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, stakeholder: impl Into<Stakeholder>) -> Result<&mut Stakeholder> {
        let stakeholder = stakeholder.into();
        let did = stakeholder.did().clone();
        if self.index.contains_key(&did) {
            return Err(EvaluationError::DuplicateStakeholder(did.to_string()));
        }

        debug!(did = %did, kind = %stakeholder.kind(), "stakeholder registered");
        let position = self.stakeholders.len();
        self.index.insert(did, position);
        self.stakeholders.push(stakeholder);
        Ok(&mut self.stakeholders[position])
    }

    pub fn get(&self, did: &Did) -> Option<&Stakeholder> {
        self.index.get(did).and_then(|&i| self.stakeholders.get(i))
    }

    pub fn get_mut(&mut self, did: &Did) -> Option<&mut Stakeholder> {
        match self.index.get(did) {
            Some(&i) => self.stakeholders.get_mut(i),
            None => None,
        }
    }

    /// Like [`StakeholderRegistry::get_mut`] but unknown DIDs are an error
    pub fn require_mut(&mut self, did: &Did) -> Result<&mut Stakeholder> {
        self.get_mut(did)
            .ok_or_else(|| EvaluationError::UnknownStakeholder(did.to_string()))
    }

    /// The provider a resource capacity references, if registered
    pub fn provider_of(&self, did: &Did) -> Option<&Stakeholder> {
        self.get(did)
            .and_then(Stakeholder::provider)
            .and_then(|provider| self.get(provider))
    }

    pub fn by_kind(&self, kind: StakeholderKind) -> impl Iterator<Item = &Stakeholder> {
        self.stakeholders.iter().filter(move |s| s.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stakeholder> {
        self.stakeholders.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stakeholder> {
        self.stakeholders.iter_mut()
    }

    pub fn records(&self) -> Vec<StakeholderRecord> {
        self.stakeholders.iter().map(Stakeholder::to_record).collect()
    }

    pub fn len(&self) -> usize {
        self.stakeholders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakeholders.is_empty()
    }
}
