//! Cairn API
//!
//! HTTP surface over the contamination-prevention layer: claim
//! submission through the validation gate, cross-validation voting,
//! contamination oversight, and credibility reads. Also hosts the
//! background hygiene and detector workers.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod service;

use cairn_access::AccessController;
use cairn_detector::DetectorWorker;
use cairn_domain::AgentId;
use cairn_gate::GatePolicy;
use cairn_hygiene::HygieneWorker;
use cairn_store::{SharedStore, SqliteStore};
use config::ServiceConfig;
use handlers::{create_router, AppState};
use service::CairnService;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// API server error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// A configured value failed validation
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Storage layer error
    #[error("Store error: {0}")]
    Store(String),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn parse_agents(ids: &[String]) -> Result<Vec<AgentId>, ApiError> {
    ids.iter()
        .map(|s| AgentId::new(s).map_err(ApiError::InvalidValue))
        .collect()
}

/// Start the API HTTP server
///
/// Opens the store, loads the gate policy, recovers stale validation
/// rounds, spawns the hygiene/detector/round-expiry workers, and
/// serves the axum router.
pub async fn start_server(config: ServiceConfig) -> Result<(), ApiError> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Cairn API");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.db_path);
    info!("Validator pool: {} agents", config.validator_pool.len());

    let store = SharedStore::new(
        SqliteStore::new(&config.db_path).map_err(|e| ApiError::Store(e.to_string()))?,
    );

    let policy = match &config.policy_path {
        Some(path) => GatePolicy::from_file(path)
            .map_err(|e| ApiError::InvalidValue(e.to_string()))?
            .into_shared(),
        None => {
            warn!("No policy file configured, using built-in category defaults");
            GatePolicy::default().into_shared()
        }
    };

    let access = AccessController::with_auditors(parse_agents(&config.auditors)?);
    let validator_pool = parse_agents(&config.validator_pool)?;

    let service = Arc::new(CairnService::new(
        store.clone(),
        policy,
        access,
        validator_pool,
    ));

    // Rounds whose deadline passed while the service was down
    let expired = service
        .recover(unix_now())
        .map_err(|e| ApiError::Store(e.to_string()))?;
    if expired > 0 {
        info!("Recovered {} stale validation rounds", expired);
    }

    // Background workers share the store through cloned handles
    let mut hygiene_store = store.clone();
    let mut hygiene_worker = HygieneWorker::new(config.hygiene.clone());
    tokio::spawn(async move {
        if let Err(e) = hygiene_worker.run(&mut hygiene_store).await {
            error!("Hygiene worker stopped: {}", e);
        }
    });

    let mut detector_store = store.clone();
    let mut detector_worker = DetectorWorker::new(config.detector.clone());
    tokio::spawn(async move {
        if let Err(e) = detector_worker.run(&mut detector_store).await {
            error!("Detector worker stopped: {}", e);
        }
    });

    let expiry_service = service.clone();
    let expiry_interval = Duration::from_secs(config.round_expiry_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(expiry_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match expiry_service.expire_rounds(unix_now()) {
                Ok(0) => {}
                Ok(n) => info!("Expired {} validation rounds", n),
                Err(e) => error!("Round expiry failed: {}", e),
            }
        }
    });

    let app = create_router(AppState { service });

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("API listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Server(e.to_string()))?;

    Ok(())
}
