use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_core::{
    build_analysis_client, build_mail_sender, create_audit_system, load_config, validate_config,
    AssignmentResolver, AuditEvent, AuditStore, Notifier, SqliteAuditStore, SqliteTicketStore,
    SqliteUserStore, TicketStore, TriageDispatcher, TriageWorkflow, UserStore,
};
use triage_server::api::create_router;
use triage_server::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("TRIAGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Secrets are hashed along with the rest; only a prefix is recorded.
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Stores
    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    let ticket_store: Arc<dyn TicketStore> = Arc::new(
        SqliteTicketStore::new(&config.database.path).context("Failed to create ticket store")?,
    );
    let user_store: Arc<dyn UserStore> = Arc::new(
        SqliteUserStore::new(&config.database.path).context("Failed to create user store")?,
    );
    info!("Stores initialized");

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;

    // Analysis
    let analysis =
        build_analysis_client(&config.analysis).context("Failed to create analysis client")?;
    info!(
        "Analysis model: {} (fallback: {})",
        config.analysis.model,
        config.analysis.fallback_model.as_deref().unwrap_or("none")
    );

    // Notifications
    let mail_sender =
        build_mail_sender(config.mail.as_ref()).context("Failed to create mail sender")?;
    info!("Mail sender: {}", mail_sender.name());
    let mut notifier = Notifier::new(mail_sender);
    if let Some(app_url) = config.mail.as_ref().and_then(|m| m.app_url.clone()) {
        notifier = notifier.with_app_url(app_url);
    }

    let workflow = Arc::new(
        TriageWorkflow::new(
            Arc::clone(&ticket_store),
            analysis,
            AssignmentResolver::new(user_store),
            notifier,
        )
        .with_audit(audit_handle.clone()),
    );

    let dispatcher = Arc::new(TriageDispatcher::new(
        config.dispatcher.clone(),
        workflow,
        Arc::clone(&ticket_store),
        Some(audit_handle.clone()),
    ));
    dispatcher.start().await;

    let state = Arc::new(AppState::new(
        config.clone(),
        audit_store,
        ticket_store,
        Arc::clone(&dispatcher),
    ));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping dispatcher...");
    dispatcher.stop().await;

    info!("Server shutting down...");
    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The writer exits once every AuditHandle clone is gone. The dispatcher
    // owns the workflow, which holds the remaining clones.
    drop(dispatcher);
    drop(audit_handle);

    let _ = writer_handle.await;
    info!("Audit writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
