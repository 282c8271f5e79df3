//! Violation catalog, escalating sanction ladders, and the disciplinary record log.

mod catalog;
pub mod domain;
pub mod memory;
pub mod repository;
mod resolver;
pub mod router;
mod sanctions;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, ViolationCatalog};
pub use domain::{
    DisciplinaryRecord, DisciplinaryRecordId, NewDisciplinaryRecord, Sanction, SanctionOverride,
    Violation, ViolationClass, ViolationId,
};
pub use memory::InMemoryDisciplinaryStore;
pub use repository::{DisciplinaryRecordStore, OffenseHistory, StudentLookup};
pub use resolver::{ClassResolution, EscalationResolver, SanctionProposal};
pub use router::discipline_router;
pub use sanctions::{OffenseOverflowPolicy, SanctionTable};
pub use service::{DisciplineError, DisciplinaryService};
