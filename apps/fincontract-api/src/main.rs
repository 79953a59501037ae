mod auth;
mod cli;
mod config;
mod error;
mod handlers;
mod routes;
mod services;
mod utils;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fincontract_db::models::promo::PromoStatus;
use fincontract_db::repositories::contract_repo::ContractRepository;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::AppConfig;
use services::analysis_service::{AnalysisBackend, DemoAnalysis, HostedAnalysisClient};
use services::audit_service::{AuditLog, MemoryAuditLog, RedisAuditLog};
use services::checkout_service::CheckoutService;
use services::contract_service::ContractService;
use services::promo_service::{PgRedemptionStore, PromoService};

#[derive(Parser)]
#[command(name = "fincontract-api", version, about = "FinContract AI backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Manage promo codes
    Promo {
        #[command(subcommand)]
        subcommand: PromoCommands,
    },
    /// Show the effective configuration
    Info,
}

#[derive(Subcommand)]
enum PromoCommands {
    /// Create a promo code
    Create {
        code: String,
        /// Plan granted on redemption
        #[arg(long, default_value = "premium")]
        plan_id: String,
        /// Days the upgrade lasts once active
        #[arg(long, default_value_t = 30)]
        days: i32,
        #[arg(long, default_value_t = 100)]
        max_usage: i32,
        /// Last day the code can be redeemed (YYYY-MM-DD)
        #[arg(long)]
        expires: String,
    },
    /// List promo codes
    List,
    /// Stop a code from being redeemed
    Disable { code: String },
    /// Re-enable a disabled code
    Enable { code: String },
    /// Show who redeemed a code
    Redemptions { code: String },
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub promo_service: Arc<PromoService>,
    pub contract_service: Arc<ContractService>,
    pub checkout_service: Arc<CheckoutService>,
    pub audit: Arc<dyn AuditLog>,
}

impl AppState {
    async fn new(config: AppConfig, pool: PgPool) -> Result<Self> {
        let backend: Arc<dyn AnalysisBackend> = if config.demo_mode {
            tracing::info!("Demo mode: contracts are analysed locally");
            Arc::new(DemoAnalysis)
        } else {
            let client = HostedAnalysisClient::new(&config.analysis)?;
            tracing::info!("Hosted analysis at {}", client.endpoint());
            Arc::new(client)
        };

        let audit: Arc<dyn AuditLog> = match &config.redis_url {
            Some(url) => match RedisAuditLog::connect(url).await {
                Ok(log) => Arc::new(log),
                Err(e) => {
                    tracing::warn!("Redis unavailable, audit log kept in memory: {:#}", e);
                    Arc::new(MemoryAuditLog::new())
                }
            },
            None => Arc::new(MemoryAuditLog::new()),
        };

        let promo_service = PromoService::new(Arc::new(PgRedemptionStore::new(pool.clone())));
        let contract_service = ContractService::new(Arc::new(ContractRepository::new(pool)), backend);
        let checkout_service = CheckoutService::new(config.checkout.products.clone());

        Ok(Self {
            config: Arc::new(config),
            promo_service: Arc::new(promo_service),
            contract_service: Arc::new(contract_service),
            checkout_service: Arc::new(checkout_service),
            audit,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env loaded: {}", e);
    }

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    let file_appender = tracing_appender::rolling::never(&config.log_dir, "fincontract.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fincontract_api=debug,tower_http=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    match cli.command {
        Commands::Serve => run_server(config).await?,
        Commands::Info => cli::print_info(&config),
        Commands::Promo { subcommand } => {
            let pool = fincontract_db::connect(&config.database_url, config.max_db_connections).await?;
            match subcommand {
                PromoCommands::Create {
                    code,
                    plan_id,
                    days,
                    max_usage,
                    expires,
                } => cli::create_promo(&pool, &code, &plan_id, days, max_usage, &expires).await?,
                PromoCommands::List => cli::list_promos(&pool).await?,
                PromoCommands::Disable { code } => {
                    cli::set_promo_status(&pool, &code, PromoStatus::Inactive).await?
                }
                PromoCommands::Enable { code } => {
                    cli::set_promo_status(&pool, &code, PromoStatus::Active).await?
                }
                PromoCommands::Redemptions { code } => cli::list_redemptions(&pool, &code).await?,
            }
        }
    }

    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("FinContract API {} starting", utils::current_version());

    let pool = fincontract_db::connect(&config.database_url, config.max_db_connections).await?;
    tracing::info!("Database ready");

    let port = config.listen_port;
    let state = AppState::new(config, pool).await?;
    let app = routes::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
