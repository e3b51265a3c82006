use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passkey_bridge::{
    ChallengeStore, KeycloakConfig, KeycloakTokenProvider, PasskeyConfig, PasskeyOrchestrator,
    cache_store_from_env, subject_store_from_env,
};
use passkey_bridge_axum::{cors_for_origin, passkey_bridge_router};

const DEFAULT_PORT: u16 = 3001;

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            "passkey_bridge_axum=debug,passkey_bridge=debug,demo_passkey=debug,info".into()
        }

        #[cfg(not(debug_assertions))]
        {
            "info".into()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn port() -> u16 {
    match std::env::var("PORT") {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid PORT {value:?}, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = PasskeyConfig::from_env()?;
    let challenges = ChallengeStore::new(cache_store_from_env().await?, config.challenge_ttl);
    let subjects = subject_store_from_env().await?;
    let tokens = KeycloakTokenProvider::new(KeycloakConfig::from_env()?)?;

    let cors = cors_for_origin(&config.origin)?;
    tracing::info!(origin = %config.origin, rp_id = %config.rp_id, "Passkey relying party configured");

    let orchestrator = PasskeyOrchestrator::new(config, challenges, subjects, Arc::new(tokens));
    let app = passkey_bridge_router(Arc::new(orchestrator)).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port()));
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
