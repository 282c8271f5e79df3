use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{Violation, ViolationClass, ViolationId};

/// Failures while building a catalog from handbook data.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read violation catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid violation catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("violation '{id}' lists unknown class '{value}'")]
    UnknownClass { id: String, value: String },
    #[error("violation '{0}' does not belong to any class")]
    MissingClasses(String),
    #[error("violation '{0}' is listed more than once")]
    DuplicateViolation(String),
}

/// Static lookup of handbook violations keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationCatalog {
    entries: BTreeMap<ViolationId, Violation>,
}

impl ViolationCatalog {
    pub fn from_violations(
        violations: impl IntoIterator<Item = Violation>,
    ) -> Result<Self, CatalogError> {
        let mut entries = BTreeMap::new();
        for violation in violations {
            if violation.classes.is_empty() {
                return Err(CatalogError::MissingClasses(violation.id.0));
            }
            if entries.contains_key(&violation.id) {
                return Err(CatalogError::DuplicateViolation(violation.id.0));
            }
            entries.insert(violation.id.clone(), violation);
        }
        Ok(Self { entries })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads `id,description,classes` rows; `classes` is slash separated (`D/E`).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut violations = Vec::new();

        for row in csv_reader.deserialize::<CatalogRow>() {
            let row = row?;
            let classes = parse_classes(&row.id, &row.classes)?;
            violations.push(Violation {
                id: ViolationId(row.id),
                description: row.description,
                classes,
            });
        }

        Self::from_violations(violations)
    }

    /// Built-in student handbook catalog.
    pub fn standard() -> Self {
        use ViolationClass::{A, B, C, D, E, F};

        let rows: [(&str, &str, &[ViolationClass]); 17] = [
            ("A1", "Not wearing the prescribed uniform or ID", &[A]),
            ("A2", "Habitual tardiness", &[A]),
            ("A3", "Littering within campus", &[A]),
            ("A4", "Loitering during class hours", &[A]),
            ("B1", "Cutting classes", &[B]),
            ("B2", "Use of profane or indecent language", &[B]),
            ("B3", "Cheating during examinations", &[B]),
            ("C1", "Vandalism of school property", &[C]),
            ("C2", "Bullying or harassment", &[C]),
            ("C3", "Forgery or tampering of school records", &[C]),
            ("D1", "Theft", &[D]),
            ("D2", "Physical assault", &[D]),
            ("DE1", "Possession of deadly weapons", &[D, E]),
            ("DE2", "Possession or use of prohibited drugs", &[D, E]),
            ("E1", "Gross misconduct causing serious injury", &[E]),
            ("E2", "Repeated physical assault on school personnel", &[E]),
            ("F1", "Conviction of a criminal offense", &[F]),
        ];

        let entries = rows
            .into_iter()
            .map(|(id, description, classes)| {
                let violation = Violation {
                    id: ViolationId(id.to_string()),
                    description: description.to_string(),
                    classes: classes.iter().copied().collect(),
                };
                (violation.id.clone(), violation)
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, id: &ViolationId) -> Option<&Violation> {
        self.entries.get(id)
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct classes touched by a selection, or the first unknown id.
    pub fn classes_for(
        &self,
        selection: &[ViolationId],
    ) -> Result<BTreeSet<ViolationClass>, ViolationId> {
        let mut classes = BTreeSet::new();
        for id in selection {
            let violation = self.entries.get(id).ok_or_else(|| id.clone())?;
            classes.extend(violation.classes.iter().copied());
        }
        Ok(classes)
    }
}

impl Default for ViolationCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    description: String,
    classes: String,
}

fn parse_classes(id: &str, raw: &str) -> Result<BTreeSet<ViolationClass>, CatalogError> {
    raw.split('/')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            ViolationClass::parse(value).ok_or_else(|| CatalogError::UnknownClass {
                id: id.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}
