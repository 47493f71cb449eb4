use clap::Parser;
use rehabilitia_server::api::{build_routes, common};
use rehabilitia_server::llm::LlmSettings;
use rehabilitia_server::state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    #[arg(short, long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Azure OpenAI API key (usually provided through the env file).
    #[arg(long, env = "AZURE_API_KEY", hide_env_values = true)]
    azure_api_key: String,

    #[arg(
        long,
        env = "AZURE_ENDPOINT",
        default_value = "https://invuniandesai-2.openai.azure.com/"
    )]
    azure_endpoint: String,

    #[arg(long, env = "AZURE_DEPLOYMENT", default_value = "gpt-4.1")]
    azure_deployment: String,

    #[arg(long, env = "AZURE_API_VERSION", default_value = "2024-12-01-preview")]
    azure_api_version: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings = LlmSettings {
        endpoint: args.azure_endpoint,
        deployment: args.azure_deployment,
        api_key: args.azure_api_key,
        api_version: args.azure_api_version,
    };

    let state = if let Some(dir) = args.data_dir {
        AppState::with_data_dir(dir, settings)
            .await
            .expect("Failed to init state")
    } else {
        AppState::new(settings).await.expect("Failed to init state")
    };

    let app_state = Arc::new(state);

    let app = build_routes(app_state)
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(common::request_logger));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind port");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
