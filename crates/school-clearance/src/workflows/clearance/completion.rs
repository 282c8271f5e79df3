use serde::{Deserialize, Serialize};

use super::domain::ClearanceMap;

/// Completion derived from a clearance map. Never cached; recompute after each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub cleared: usize,
    pub total: usize,
    pub percentage: u8,
    pub fully_cleared: bool,
}

impl Completion {
    pub fn of(clearance: &ClearanceMap) -> Self {
        let percentage = completion_percentage(clearance);
        Self {
            cleared: clearance.cleared_count(),
            total: clearance.len(),
            percentage,
            fully_cleared: percentage == 100 && !clearance.is_empty(),
        }
    }
}

/// Rounded share of cleared requirements, 0 for an empty map.
///
/// Rounds half up, but never reports 100 while any requirement is still pending.
pub fn completion_percentage(clearance: &ClearanceMap) -> u8 {
    let total = clearance.len();
    if total == 0 {
        return 0;
    }

    let cleared = clearance.cleared_count();
    let rounded = (200 * cleared + total) / (2 * total);
    if cleared < total {
        rounded.min(99) as u8
    } else {
        100
    }
}

pub fn is_fully_cleared(clearance: &ClearanceMap) -> bool {
    completion_percentage(clearance) == 100 && !clearance.is_empty()
}
