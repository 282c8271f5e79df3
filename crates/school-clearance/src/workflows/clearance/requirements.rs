use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::RequirementKey;
use crate::workflows::StaffId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Subject,
    Office,
    /// Class adviser sign-off; reviews surface participation counts.
    Adviser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDefinition {
    pub key: RequirementKey,
    pub kind: RequirementKind,
    pub approver: StaffId,
    #[serde(default)]
    pub section_approvers: BTreeMap<String, StaffId>,
}

impl RequirementDefinition {
    pub fn new(key: &str, kind: RequirementKind, approver: &str) -> Self {
        Self {
            key: RequirementKey::new(key),
            kind,
            approver: StaffId(approver.to_string()),
            section_approvers: BTreeMap::new(),
        }
    }

    pub fn subject(key: &str, approver: &str) -> Self {
        Self::new(key, RequirementKind::Subject, approver)
    }

    pub fn office(key: &str, approver: &str) -> Self {
        Self::new(key, RequirementKind::Office, approver)
    }

    pub fn adviser(key: &str, approver: &str) -> Self {
        Self::new(key, RequirementKind::Adviser, approver)
    }

    /// Route one section's requests to a different approver.
    pub fn with_section_approver(mut self, section: &str, approver: &str) -> Self {
        self.section_approvers
            .insert(section.to_string(), StaffId(approver.to_string()));
        self
    }

    pub fn approver_for(&self, section: &str) -> &StaffId {
        self.section_approvers.get(section).unwrap_or(&self.approver)
    }
}

/// Known requirement keys and who signs them off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementCatalog {
    definitions: BTreeMap<RequirementKey, RequirementDefinition>,
}

impl RequirementCatalog {
    pub fn new(definitions: impl IntoIterator<Item = RequirementDefinition>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|definition| (definition.key.clone(), definition))
            .collect();
        Self { definitions }
    }

    pub fn with(mut self, definition: RequirementDefinition) -> Self {
        self.definitions.insert(definition.key.clone(), definition);
        self
    }

    /// Canonical key for `name`, matched case-insensitively after trimming.
    pub fn resolve(&self, name: &str) -> Option<RequirementKey> {
        let wanted = name.trim();
        self.definitions
            .keys()
            .find(|key| key.as_str().eq_ignore_ascii_case(wanted))
            .cloned()
    }

    pub fn definition(&self, key: &RequirementKey) -> Option<&RequirementDefinition> {
        self.definitions.get(key)
    }

    pub fn designated_approver(&self, key: &RequirementKey, section: &str) -> Option<&StaffId> {
        self.definitions
            .get(key)
            .map(|definition| definition.approver_for(section))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RequirementKey> {
        self.definitions.keys()
    }
}
