use assignment_sync::adapters::inbound::{FileDocumentStore, MemoryDocumentStore};
use assignment_sync::adapters::outbound::{init_combined_logger, init_logging_notifier, init_tracing};
use assignment_sync::application::load_candidates;
use assignment_sync::common::{ApplicationResult, DocumentRef, DocumentStore, WriteBatch};
use assignment_sync::domains::selection::CandidateFilter;
use assignment_sync::{AssignmentContext, AssignmentEngine, Config, EngineSettings, SelectionState};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEMO_ORDER: &str = "os-1001";

#[tokio::main]
async fn main() -> ApplicationResult<()> {
    init_tracing().map_err(anyhow::Error::from)?;

    info!("Starting assignment-sync");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    info!("Configuration loaded (cache ttl {} ms)", config.cache.ttl_ms);

    let logger = init_combined_logger(&config.logging);
    let notifier = init_logging_notifier(logger.clone());

    let store: Arc<dyn DocumentStore> = match &config.store.data_file {
        Some(path) => {
            info!("Using file store at {}", path.display());
            Arc::new(FileDocumentStore::new(path.clone()))
        }
        None => {
            info!("Using in-memory store");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    seed_demo_data(store.as_ref(), &config).await?;

    let context = Arc::new(AssignmentContext::from_config(&config, store.clone(), logger.clone()));
    let engine = AssignmentEngine::new(
        store.clone(),
        context.clone(),
        notifier.clone(),
        logger,
        EngineSettings::from_config(&config),
    );

    // Pick the available washers, the way a selection dialog would.
    let candidates = load_candidates(store.as_ref(), &config.collections.workers).await?;
    let mut selection = SelectionState::new(&[], notifier);
    let washers = selection.filter(
        &candidates,
        &CandidateFilter {
            specialty: Some("lavagem".to_string()),
            only_available: true,
        },
    );
    let washer_ids: Vec<String> = washers.iter().map(|c| c.id.clone()).collect();
    for id in &washer_ids {
        selection.toggle(id);
    }

    let mut picked: Vec<String> = Vec::new();
    selection.confirm(
        &candidates,
        Some(|ids: Vec<String>, names: Vec<String>| {
            info!("Confirmed selection: {}", names.join(", "));
            picked = ids;
        }),
    );

    if !engine
        .assign_many(picked.as_slice(), DEMO_ORDER, "lavagem", Some("externa"))
        .await
    {
        warn!("Assignment failed");
    }

    context
        .cache
        .invalidate_document(&config.collections.orders, DEMO_ORDER)
        .await;
    for worker in engine.list_assigned(DEMO_ORDER, "lavagem", Some("externa")).await {
        info!("Assigned: {} ({})", worker.name, worker.id);
    }

    for id in &picked {
        if !engine.release(id, DEMO_ORDER, "lavagem", Some("externa")).await {
            error!("Release of {} failed", id);
        }
    }

    // Give the buffered domain logger a moment to drain.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    info!("assignment-sync finished");
    Ok(())
}

/// Writes a small demo dataset when the workers collection is empty.
async fn seed_demo_data(store: &dyn DocumentStore, config: &Config) -> ApplicationResult<()> {
    if !store.query(&config.collections.workers, &[]).await?.is_empty() {
        return Ok(());
    }

    let mut batch = WriteBatch::new();
    for (id, name, specialties) in [
        ("func-01", "Ana Souza", vec!["lavagem", "vistoria_inicial"]),
        ("func-02", "Bruno Lima", vec!["lavagem"]),
        ("func-03", "Carla Dias", vec!["pintura"]),
    ] {
        batch.set(
            DocumentRef::new(&config.collections.workers, id),
            json!({"name": name, "busy": false, "active": true, "specialties": specialties}),
        );
    }
    batch.set(
        DocumentRef::new(&config.collections.orders, DEMO_ORDER),
        json!({"plate": "ABC1D23", "stageProgress": {}}),
    );
    store.commit(batch).await?;
    info!("Seeded demo data");
    Ok(())
}
