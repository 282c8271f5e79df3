use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Sanction, ViolationClass};

/// What an offense ordinal past the end of a ladder resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffenseOverflowPolicy {
    /// Repeat the harshest tier.
    #[default]
    ClampToHarshest,
    /// Propose nothing for that class.
    Omit,
}

/// Escalating sanctions per class, indexed by prior offense count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanctionTable {
    ladders: BTreeMap<ViolationClass, Vec<Sanction>>,
}

impl SanctionTable {
    pub fn new(ladders: BTreeMap<ViolationClass, Vec<Sanction>>) -> Self {
        Self { ladders }
    }

    pub fn standard() -> Self {
        let ladder = |labels: &[&str]| -> Vec<Sanction> {
            labels.iter().map(|label| Sanction::new(*label)).collect()
        };

        let mut ladders = BTreeMap::new();
        ladders.insert(
            ViolationClass::A,
            ladder(&[
                "Oral Warning",
                "Written Warning",
                "Suspension (1 day)",
                "Suspension (3 days)",
                "Exclusion",
            ]),
        );
        ladders.insert(
            ViolationClass::B,
            ladder(&[
                "Written Warning",
                "Suspension (3 days)",
                "Suspension (5 days)",
                "Exclusion",
            ]),
        );
        ladders.insert(
            ViolationClass::C,
            ladder(&["Suspension (3 days)", "Suspension (5 days)", "Exclusion"]),
        );
        ladders.insert(
            ViolationClass::D,
            ladder(&["Suspension (5 days)", "Exclusion"]),
        );
        ladders.insert(ViolationClass::E, ladder(&["Exclusion"]));
        ladders.insert(ViolationClass::F, ladder(&["Expulsion"]));

        Self { ladders }
    }

    pub fn ladder(&self, class: ViolationClass) -> &[Sanction] {
        self.ladders
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Sanction for an offense after `prior_offenses` earlier ones in the same class.
    pub fn sanction_for(
        &self,
        class: ViolationClass,
        prior_offenses: u32,
        policy: OffenseOverflowPolicy,
    ) -> Option<&Sanction> {
        let ladder = self.ladder(class);
        match ladder.get(prior_offenses as usize) {
            Some(sanction) => Some(sanction),
            None => match policy {
                OffenseOverflowPolicy::ClampToHarshest => ladder.last(),
                OffenseOverflowPolicy::Omit => None,
            },
        }
    }
}

impl Default for SanctionTable {
    fn default() -> Self {
        Self::standard()
    }
}
