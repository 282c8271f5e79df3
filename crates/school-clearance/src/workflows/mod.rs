pub mod clearance;
pub mod discipline;
mod shared;

pub use shared::{FileRef, StaffId, StoreError, StudentId};
