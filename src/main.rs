use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod identify;
mod models;
mod routes;
mod upload;

use config::Config;
use identify::Recognizer;
use routes::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is not an error; the real environment still applies.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let recognizer = match Recognizer::new(&config) {
        Ok(recognizer) => recognizer,
        Err(e) => {
            tracing::error!("failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = config.listen_addr;
    tracing::info!(model = %config.model, "using model");
    let app = routes::router(Arc::new(AppState { config, recognizer }));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
