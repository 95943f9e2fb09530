use std::sync::Arc;

use agent_flow::{
    Agent, InMemorySessionStorage, LlmClient, PostgresSessionStorage, SessionStorage,
};
use claims_assistant_service::clients::ClientDirectory;
use claims_assistant_service::prompt::SYSTEM_PROMPT;
use claims_assistant_service::tools::claims_tool_registry;
use claims_assistant_service::{AppState, create_app};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "claims_assistant_service=debug,agent_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            // Human-readable logging for development
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            // Structured JSON logging for production
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

async fn create_session_storage() -> Arc<dyn SessionStorage> {
    // Use PostgreSQL when DATABASE_URL is set, otherwise in-memory
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        info!("Using PostgreSQL session storage");
        match PostgresSessionStorage::connect(&database_url).await {
            Ok(postgres_storage) => Arc::new(postgres_storage),
            Err(e) => {
                error!(
                    "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                    e
                );
                Arc::new(InMemorySessionStorage::new())
            }
        }
    } else {
        info!("Using in-memory session storage (set DATABASE_URL to use PostgreSQL)");
        Arc::new(InMemorySessionStorage::new())
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let client = match LlmClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to configure LLM client: {}", e);
            std::process::exit(1);
        }
    };
    info!(model = %client.model(), "LLM client configured");

    let clients_path =
        std::env::var("CLIENTS_PATH").unwrap_or_else(|_| "data/clients.csv".to_string());
    let directory = match ClientDirectory::load(&clients_path) {
        Ok(directory) => Arc::new(directory),
        Err(e) => {
            error!("Failed to load client directory from {}: {}", clients_path, e);
            std::process::exit(1);
        }
    };

    let agent = Arc::new(
        Agent::builder(client)
            .system_prompt(SYSTEM_PROMPT)
            .tools(claims_tool_registry(directory))
            .build(),
    );

    let session_storage = create_session_storage().await;

    let app = create_app(AppState {
        agent,
        session_storage,
    });

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server running on http://{addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
