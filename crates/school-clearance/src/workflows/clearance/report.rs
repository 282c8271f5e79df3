use std::collections::BTreeMap;

use serde::Serialize;

use super::completion::Completion;
use super::domain::{RequirementKey, Student};
use crate::workflows::StudentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentCompletionEntry {
    pub student_id: StudentId,
    pub grade_level: String,
    pub completion: Completion,
}

/// A requirement and how many students in the section still owe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bottleneck {
    pub requirement_key: RequirementKey,
    pub outstanding: usize,
}

/// Clearance progress across one section, for advisers and the registrar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionReport {
    pub section: String,
    pub students: usize,
    pub fully_cleared: usize,
    pub average_completion: f32,
    /// Students still pending per requirement.
    pub outstanding: BTreeMap<RequirementKey, usize>,
    /// Requirements ranked by outstanding count, most owed first.
    pub bottlenecks: Vec<Bottleneck>,
    pub entries: Vec<StudentCompletionEntry>,
}

impl SectionReport {
    pub fn build(section: &str, students: &[Student]) -> Self {
        let mut outstanding: BTreeMap<RequirementKey, usize> = BTreeMap::new();
        let mut entries = Vec::with_capacity(students.len());

        for student in students {
            for key in student.clearance.outstanding() {
                *outstanding.entry(key.clone()).or_default() += 1;
            }
            entries.push(StudentCompletionEntry {
                student_id: student.id.clone(),
                grade_level: student.grade_level.clone(),
                completion: Completion::of(&student.clearance),
            });
        }

        let fully_cleared = entries
            .iter()
            .filter(|entry| entry.completion.fully_cleared)
            .count();
        let average_completion = if entries.is_empty() {
            0.0
        } else {
            let sum: u32 = entries
                .iter()
                .map(|entry| u32::from(entry.completion.percentage))
                .sum();
            sum as f32 / entries.len() as f32
        };

        let mut bottlenecks: Vec<Bottleneck> = outstanding
            .iter()
            .map(|(key, count)| Bottleneck {
                requirement_key: key.clone(),
                outstanding: *count,
            })
            .collect();
        bottlenecks.sort_by(|left, right| {
            right
                .outstanding
                .cmp(&left.outstanding)
                .then_with(|| left.requirement_key.cmp(&right.requirement_key))
        });

        Self {
            section: section.to_string(),
            students: entries.len(),
            fully_cleared,
            average_completion,
            outstanding,
            bottlenecks,
            entries,
        }
    }
}
