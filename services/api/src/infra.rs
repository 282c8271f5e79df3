use metrics_exporter_prometheus::PrometheusHandle;
use school_clearance::config::ClearanceConfig;
use school_clearance::error::AppError;
use school_clearance::workflows::clearance::{
    ClearanceEvent, ClearanceService, EventOutcome, InMemoryClearanceStore,
    InMemoryParticipationLedger, NotificationEmitter, NotificationError, RequirementCatalog,
    RequirementDefinition,
};
use school_clearance::workflows::discipline::{
    DisciplinaryService, EscalationResolver, InMemoryDisciplinaryStore, SanctionTable,
    ViolationCatalog, ViolationClass, ViolationId,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Delivers clearance outcomes to the service log.
#[derive(Debug, Default, Clone)]
pub(crate) struct LoggingNotificationEmitter;

impl NotificationEmitter for LoggingNotificationEmitter {
    fn emit(&self, event: ClearanceEvent) -> Result<(), NotificationError> {
        match event.outcome {
            EventOutcome::Approved => info!(
                target: "clearance::notifications",
                student = %event.student_id,
                requirement = %event.requirement_key,
                "requirement cleared"
            ),
            EventOutcome::Rejected => info!(
                target: "clearance::notifications",
                student = %event.student_id,
                requirement = %event.requirement_key,
                reason = event.reason.as_deref().unwrap_or_default(),
                "clearance request returned"
            ),
        }
        Ok(())
    }
}

pub(crate) fn default_requirement_catalog() -> RequirementCatalog {
    RequirementCatalog::new([
        RequirementDefinition::subject("English", "t-english"),
        RequirementDefinition::subject("Filipino", "t-filipino"),
        RequirementDefinition::subject("Mathematics", "t-math"),
        RequirementDefinition::subject("Science", "t-science"),
        RequirementDefinition::subject("Araling Panlipunan", "t-ap"),
        RequirementDefinition::subject("MAPEH", "t-mapeh"),
        RequirementDefinition::office("Library", "o-library"),
        RequirementDefinition::office("Guidance Office", "o-guidance"),
        RequirementDefinition::office("Accounting", "o-accounting"),
        RequirementDefinition::office("Registrar", "o-registrar"),
        RequirementDefinition::adviser("Class Adviser", "t-adviser"),
    ])
}

/// Builds the escalation resolver, loading the CSV catalog when one is configured.
pub(crate) type ServedClearance =
    ClearanceService<InMemoryClearanceStore, InMemoryDisciplinaryStore, LoggingNotificationEmitter>;
pub(crate) type ServedDiscipline =
    DisciplinaryService<InMemoryClearanceStore, InMemoryDisciplinaryStore>;

/// Both workflows over one shared roster and disciplinary log.
pub(crate) fn in_memory_services(
    resolver: EscalationResolver,
) -> (Arc<ServedClearance>, Arc<ServedDiscipline>) {
    let store = Arc::new(InMemoryClearanceStore::default());
    let records = Arc::new(InMemoryDisciplinaryStore::default());
    let clearance = ClearanceService::new(
        store.clone(),
        records.clone(),
        Arc::new(LoggingNotificationEmitter),
        default_requirement_catalog(),
    )
    .with_participation(Arc::new(InMemoryParticipationLedger::default()));
    let discipline = DisciplinaryService::new(store, records, resolver);
    (Arc::new(clearance), Arc::new(discipline))
}

pub(crate) fn build_resolver(config: &ClearanceConfig) -> Result<EscalationResolver, AppError> {
    let catalog = match &config.violation_catalog {
        Some(path) => {
            let catalog = ViolationCatalog::from_path(path)?;
            info!(path = %path.display(), violations = catalog.len(), "violation catalog loaded");
            catalog
        }
        None => ViolationCatalog::standard(),
    };
    Ok(EscalationResolver::new(
        catalog,
        SanctionTable::standard(),
        config.offense_overflow,
    ))
}

/// Parses `A=2,B=0` into per-class prior offense counts.
pub(crate) fn parse_class_counts(raw: &str) -> Result<BTreeMap<ViolationClass, u32>, String> {
    let mut counts = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (class, count) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected CLASS=COUNT, found '{entry}'"))?;
        let class = ViolationClass::parse(class)
            .ok_or_else(|| format!("unknown violation class '{}'", class.trim()))?;
        let count = count
            .trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid offense count in '{entry}' ({err})"))?;
        counts.insert(class, count);
    }
    Ok(counts)
}

pub(crate) fn parse_violation_id(raw: &str) -> Result<ViolationId, String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err("violation ids must not be empty".to_string());
    }
    Ok(ViolationId(id.to_ascii_uppercase()))
}
