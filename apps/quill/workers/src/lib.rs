//! Quill Workers
//!
//! Background worker fleet for the Quill publishing platform. One binary
//! hosts all ten worker kinds; each deployment runs exactly one kind,
//! selected with `--worker`.
//!
//! ## Architecture
//!
//! ```text
//! RabbitMQ (<domain>_queue)
//!   ↓ (prefetch 1, bounded-wait poll)
//! AmqpWorker<Handler>
//!   ↓ (validate, dedup, call downstream, persist)
//! Platform API / chat model / SMTP relay / peer sites
//!   ↓ (on exhausted retries or open circuit)
//! RabbitMQ (<domain>_dlx_queue)
//! ```
//!
//! ## Workers
//!
//! | Kind             | Queue domain     | Downstream                    |
//! |------------------|------------------|-------------------------------|
//! | `moderation`     | `moderation`     | chat model + platform API     |
//! | `summaries`      | `summaries`      | chat model + platform API     |
//! | `link_audit`     | `link_audit`     | peer sites + platform API     |
//! | `link_connect`   | `link_connect`   | peer sites + platform API     |
//! | `link_push`      | `link_push`      | peer sites + platform API     |
//! | `link_monitor`   | `link_monitor`   | peer sites + platform API     |
//! | `mail`           | `mail`           | SMTP relay + platform API     |
//! | `pages`          | `pages`          | render service + local disk   |
//! | `skeleton_pages` | `skeleton_pages` | render service + local disk   |
//! | `callbacks`      | `callbacks`      | subscriber URLs + platform API|
//!
//! ## Features
//!
//! - Bounded retries with dead-letter parking per worker
//! - Per-resource circuit breaker for flaky downstream endpoints
//! - Self-healing consume sessions with broker probes
//! - Graceful shutdown on SIGINT/SIGTERM
//! - Admin HTTP server: health, readiness, Prometheus metrics, DLQ
//!   inspection and redrive

use ai_client::OpenAiChatModel;
use amqp_worker::{
    admin_router, AdminState, AmqpWorker, ChannelProvider, DlqManager, QueueTopology, TaskHandler,
    WorkerConfig,
};
use clap::{Parser, ValueEnum};
use core_config::platform::PlatformApiConfig;
use core_config::server::AdminServerConfig;
use core_config::{broker::BrokerConfig, ConfigError, Environment, FromEnv};
use domain_callbacks::{CallbackHandler, HttpCallbackSender, HttpCallbackStore};
use domain_links::{
    AuditHandler, ConnectHandler, HttpLinkStore, HttpPeerClient, MonitorHandler, PushHandler,
    SiteIdentity,
};
use domain_moderation::{HttpCommentStore, ModerationHandler};
use domain_notifications::{HttpMailStore, MailHandler, SmtpMailer};
use domain_pages::{HttpPageRenderer, HttpPageStore, PageHandler, RenderMode};
use domain_summaries::{HttpPostStore, SummariesHandler};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// The worker kinds this binary can run.
///
/// The CLI value doubles as the queue domain name, so
/// `--worker link_audit` consumes from `link_audit_queue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum WorkerKind {
    Moderation,
    Summaries,
    LinkAudit,
    LinkConnect,
    LinkPush,
    LinkMonitor,
    Mail,
    Pages,
    SkeletonPages,
    Callbacks,
}

impl WorkerKind {
    /// Queue domain name: names the exchange/queue pair and shows up in
    /// logs and metric labels.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Moderation => "moderation",
            Self::Summaries => "summaries",
            Self::LinkAudit => "link_audit",
            Self::LinkConnect => "link_connect",
            Self::LinkPush => "link_push",
            Self::LinkMonitor => "link_monitor",
            Self::Mail => "mail",
            Self::Pages => "pages",
            Self::SkeletonPages => "skeleton_pages",
            Self::Callbacks => "callbacks",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Background workers for the Quill publishing platform"
)]
struct Args {
    /// Worker kind to run in this process
    #[arg(short, long, value_enum)]
    worker: WorkerKind,

    /// Admin HTTP port (overrides ADMIN_PORT)
    #[arg(long)]
    http_port: Option<u16>,
}

/// Run one Quill worker
///
/// This is the main entry point for the worker binary. It:
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Parses the CLI to pick the worker kind
/// 3. Installs the Prometheus recorder and spawns the admin HTTP server
/// 4. Builds the worker's collaborators from the environment
/// 5. Runs the worker with graceful shutdown handling
///
/// # Errors
///
/// Returns an error if:
/// - Broker or worker configuration is invalid
/// - A collaborator (platform API, chat model, SMTP relay) cannot be built
/// - The first consume session cannot be established
/// - The worker encounters a fatal error
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();

    // Initialize tracing (env-aware: JSON for prod, pretty for dev)
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let args = Args::parse();
    let domain = args.worker.domain();

    // Initialize Prometheus metrics
    amqp_worker::init_metrics();

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        worker = %domain,
        "Starting Quill worker"
    );
    info!("Environment: {:?}", environment);

    // Broker and admin server configuration from the environment
    let broker = BrokerConfig::from_env().wrap_err("Failed to load broker configuration")?;
    let admin = resolve_admin_config(args.http_port)
        .wrap_err("Failed to load admin server configuration")?;

    let max_retries: u32 = core_config::env_parse_or_default("WORKER_MAX_RETRIES", 2)
        .wrap_err("Failed to parse WORKER_MAX_RETRIES")?;
    let config = WorkerConfig::new(domain).with_max_retries(max_retries);
    let topology = resolve_topology(domain);

    // One connection, one channel, shared by the worker and the DLQ admin
    let provider = Arc::new(ChannelProvider::new(
        broker.url,
        format!("{}-{}", broker.connection_name, domain),
        config.prefetch,
    ));

    info!(
        queue = %topology.queue,
        dlx_queue = %topology.dlx_queue,
        max_retries = config.max_retries,
        "Worker configuration loaded"
    );

    // Every worker persists through the platform API
    let platform =
        PlatformApiConfig::from_env().wrap_err("Failed to load platform API configuration")?;

    // Set up a shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    match args.worker {
        WorkerKind::Moderation => {
            let store = HttpCommentStore::new(platform)?;
            let model =
                OpenAiChatModel::from_env().wrap_err("Failed to configure the chat model")?;
            let handler = ModerationHandler::new(store, model);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::Summaries => {
            let store = HttpPostStore::new(platform)?;
            let model =
                OpenAiChatModel::from_env().wrap_err("Failed to configure the chat model")?;
            let handler = SummariesHandler::new(store, model);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::LinkAudit => {
            let store = HttpLinkStore::new(platform)?;
            let handler = AuditHandler::new(store, HttpPeerClient::new()?);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::LinkConnect => {
            let store = HttpLinkStore::new(platform)?;
            let site = SiteIdentity::from_env().wrap_err("Failed to load site identity")?;
            let handler = ConnectHandler::new(store, HttpPeerClient::new()?, site);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::LinkPush => {
            let store = HttpLinkStore::new(platform)?;
            let handler = PushHandler::new(store, HttpPeerClient::new()?);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::LinkMonitor => {
            let store = HttpLinkStore::new(platform)?;
            let handler = MonitorHandler::new(store, HttpPeerClient::new()?);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::Mail => {
            let store = HttpMailStore::new(platform)?;
            let mailer = SmtpMailer::from_env().wrap_err("Failed to configure the SMTP relay")?;
            let handler = MailHandler::new(store, mailer);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::Pages => {
            let handler = page_handler(platform, RenderMode::Static)?;
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::SkeletonPages => {
            let handler = page_handler(platform, RenderMode::Skeleton)?;
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
        WorkerKind::Callbacks => {
            let store = HttpCallbackStore::new(platform)?;
            let handler = CallbackHandler::new(store, HttpCallbackSender::new()?);
            run_worker(handler, provider, topology, config, admin, shutdown_rx).await
        }
    }
}

/// Admin server bind config, with the CLI port taking precedence over
/// `ADMIN_PORT`.
fn resolve_admin_config(http_port: Option<u16>) -> Result<AdminServerConfig, ConfigError> {
    let mut config = AdminServerConfig::from_env()?;
    if let Some(port) = http_port {
        config.port = port;
    }
    Ok(config)
}

/// Queue topology for the worker's domain. Each name falls back to the
/// `<domain>_*` convention and can be overridden individually; the keys
/// are flat because one process runs exactly one worker kind.
fn resolve_topology(domain: &str) -> QueueTopology {
    let defaults = QueueTopology::for_domain(domain);
    let exchange = core_config::env_or_default("QUEUE_EXCHANGE", &defaults.exchange);
    let routing_key = core_config::env_or_default("QUEUE_ROUTING_KEY", &defaults.routing_key);
    let queue = core_config::env_or_default("QUEUE_NAME", &defaults.queue);
    let dlx_exchange = core_config::env_or_default("QUEUE_DLX_EXCHANGE", &defaults.dlx_exchange);
    let dlx_queue = core_config::env_or_default("QUEUE_DLX_QUEUE", &defaults.dlx_queue);

    defaults
        .with_exchange(exchange)
        .with_routing_key(routing_key)
        .with_queue(queue)
        .with_dlx(dlx_exchange, dlx_queue)
}

/// Page workers share one handler type; only the render mode and the
/// queue they consume from differ.
fn page_handler(
    platform: PlatformApiConfig,
    mode: RenderMode,
) -> Result<PageHandler<HttpPageStore, HttpPageRenderer>> {
    let output_root = core_config::env_or_default("PAGES_OUTPUT_ROOT", "public");
    let store = HttpPageStore::new(platform.clone())?;
    let renderer = HttpPageRenderer::new(platform)?;
    Ok(PageHandler::new(store, renderer, mode, output_root))
}

/// Build the worker, spawn its admin server, and run it until shutdown.
async fn run_worker<H: TaskHandler>(
    handler: H,
    provider: Arc<ChannelProvider>,
    topology: QueueTopology,
    config: WorkerConfig,
    admin: AdminServerConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let worker = AmqpWorker::new(handler, Arc::clone(&provider), topology.clone(), config);

    let state = AdminState {
        status: worker.status(),
        dlq: DlqManager::new(provider, topology),
    };
    tokio::spawn(async move {
        if let Err(e) = serve_admin(state, admin).await {
            error!(error = %e, "Admin server failed");
        }
    });

    worker
        .run(shutdown)
        .await
        .wrap_err("Worker terminated with an error")?;

    info!("Quill worker stopped");
    Ok(())
}

/// Start the admin HTTP server
///
/// Provides endpoints for:
/// - Liveness probes: `/health`, `/healthz`
/// - Readiness probes: `/ready`, `/readyz`
/// - Prometheus metrics: `/metrics`
/// - DLQ admin: `/admin/dlq/stats`, `/admin/dlq/redrive`
async fn serve_admin(state: AdminState, config: AdminServerConfig) -> Result<()> {
    let app = admin_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind admin server to {}", addr))?;

    info!(address = %addr, "Admin server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Admin server failed")?;

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
