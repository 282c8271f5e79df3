use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::{FileRef, StaffId, StudentId};

/// Severity tier of a violation; each tier owns its own sanction ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationClass {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl ViolationClass {
    pub const ALL: [ViolationClass; 6] = [
        ViolationClass::A,
        ViolationClass::B,
        ViolationClass::C,
        ViolationClass::D,
        ViolationClass::E,
        ViolationClass::F,
    ];

    pub const fn letter(self) -> &'static str {
        match self {
            ViolationClass::A => "A",
            ViolationClass::B => "B",
            ViolationClass::C => "C",
            ViolationClass::D => "D",
            ViolationClass::E => "E",
            ViolationClass::F => "F",
        }
    }

    /// Accepts `"B"`, `"b"` and `"Class B"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let letter = trimmed
            .strip_prefix("Class ")
            .or_else(|| trimmed.strip_prefix("class "))
            .unwrap_or(trimmed);
        Self::ALL
            .into_iter()
            .find(|class| class.letter().eq_ignore_ascii_case(letter))
    }
}

impl fmt::Display for ViolationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class {}", self.letter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationId(pub String);

impl fmt::Display for ViolationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handbook entry. A violation tagged with several classes counts against every ladder it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub id: ViolationId,
    pub description: String,
    pub classes: BTreeSet<ViolationClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sanction(pub String);

impl Sanction {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sanction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisciplinaryRecordId(pub String);

/// Append-only log entry. Classes and sanctions are fixed when the record is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplinaryRecord {
    pub id: DisciplinaryRecordId,
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub violations: Vec<ViolationId>,
    pub classes: BTreeSet<ViolationClass>,
    pub sanctions: Vec<Sanction>,
    pub witnesses: Vec<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<StaffId>,
    pub recorded_at: DateTime<Utc>,
}

impl DisciplinaryRecord {
    pub fn involves(&self, class: ViolationClass) -> bool {
        self.classes.contains(&class)
    }
}

/// How the recorder adjusts the proposed sanctions before committing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SanctionOverride {
    #[default]
    UseProposed,
    Replace {
        sanctions: Vec<Sanction>,
    },
    Adjust {
        #[serde(default)]
        add: Vec<Sanction>,
        #[serde(default)]
        remove: Vec<Sanction>,
    },
}

impl SanctionOverride {
    pub fn apply(&self, proposed: Vec<Sanction>) -> Vec<Sanction> {
        match self {
            SanctionOverride::UseProposed => proposed,
            SanctionOverride::Replace { sanctions } => sanctions.clone(),
            SanctionOverride::Adjust { add, remove } => {
                let mut sanctions: Vec<Sanction> = proposed
                    .into_iter()
                    .filter(|sanction| !remove.contains(sanction))
                    .collect();
                sanctions.extend(add.iter().cloned());
                sanctions
            }
        }
    }
}

/// Input captured by the disciplinary recording form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDisciplinaryRecord {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub violations: Vec<ViolationId>,
    #[serde(default)]
    pub witnesses: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub evidence: Option<FileRef>,
    #[serde(default)]
    pub recorded_by: Option<StaffId>,
    #[serde(default)]
    pub sanction_override: SanctionOverride,
}
