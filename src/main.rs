//! HM Freight gateway
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│ Services │───▶│ Gateway  │
//! │  (YAML)  │    │ (Store)  │    │  (HTTP)  │
//! └──────────┘    └────┬─────┘    └──────────┘
//!                      │
//!                 ┌────▼─────┐
//!                 │ Sweeper  │
//!                 └──────────┘
//! ```
//!
//! Usage: `hm_freight [--env dev] [--port 8080]`

use std::sync::Arc;
use std::time::Duration;

use hm_freight::config::AppConfig;
use hm_freight::context::{FreightContext, FreightServices};
use hm_freight::db::Database;
use hm_freight::gateway::{self, auth::JwtService, state::AppState};
use hm_freight::offer::{ExpirySweeper, SweeperConfig};
use hm_freight::store::{FreightStore, MemoryStore, PgStore, schema};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

/// PostgreSQL when configured, memory otherwise
async fn open_store(config: &AppConfig) -> anyhow::Result<(Arc<dyn FreightStore>, Option<Database>)> {
    match config.postgres_url {
        Some(ref url) => {
            let db = Database::connect(url, config.postgres_max_connections).await?;
            schema::init_schema(db.pool()).await?;
            tracing::info!("[Store] PostgreSQL");
            let store: Arc<dyn FreightStore> = Arc::new(PgStore::new(&db));
            Ok((store, Some(db)))
        }
        None => {
            tracing::warn!("[Store] No postgres_url configured, state is in-memory only");
            let store: Arc<dyn FreightStore> = Arc::new(MemoryStore::new());
            Ok((store, None))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = hm_freight::logging::init_logging(&app_config);

    tracing::info!(
        git_hash = gateway::handlers::health::GIT_HASH,
        "Starting HM Freight in {} mode",
        env
    );

    let (store, pg_db) = open_store(&app_config).await?;
    let ctx = Arc::new(FreightContext::production(
        store,
        (&app_config.lifecycle).into(),
    ));
    let services = FreightServices::new(ctx.clone());

    let sweep_secs = app_config.lifecycle.expiry_sweep_interval_secs;
    if sweep_secs > 0 {
        let sweeper = ExpirySweeper::new(
            services.offers.clone(),
            ctx.clock.clone(),
            SweeperConfig {
                interval: Duration::from_secs(sweep_secs),
            },
        );
        tokio::spawn(async move {
            sweeper.run().await;
        });
    } else {
        tracing::info!("Expiry sweeper disabled");
    }

    let jwt = Arc::new(JwtService::new(
        app_config.auth.jwt_secret.clone(),
        app_config.auth.token_ttl_hours,
    ));
    let state = Arc::new(AppState::new(services, jwt, pg_db));

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, state).await
}
