use pdf_rag_chat::api::{self, AppState};
use pdf_rag_chat::commands::{print_help, CommandHandler, CommandOutcome};
use pdf_rag_chat::config::{RagSettings, SettingsPatch};
use pdf_rag_chat::database::{InMemoryVectorDB, VectorStore};
use pdf_rag_chat::document::PdfLoader;
use pdf_rag_chat::providers::GeminiFactory;
use pdf_rag_chat::providers::traits::ProviderFactory;
use pdf_rag_chat::session::RagServices;
use std::net::SocketAddr;
use std::sync::Arc;
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use rustyline::history::DefaultHistory;
use tokio::net::TcpListener;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Chat with your PDF documents using Gemini", long_about = None)]
struct Args {
    #[arg(short, long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "3000")]
    port: u16,

    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    chunk_overlap: Option<usize>,

    #[arg(long)]
    k_results: Option<usize>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Vector store error: {0}")]
    VectorStoreError(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("Terminal error: {0}")]
    TerminalError(String),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables
    dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // The terminal is for answers, so stay quiet there unless asked
    let default_level = if args.api { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let factory = GeminiFactory::from_env();
    let settings = initial_settings(&args, &factory.available_models())?;
    let services = RagServices {
        factory: Arc::new(factory),
        store: vector_store(args.qdrant_url.as_deref()).await?,
        loader: Arc::new(PdfLoader::new()),
    };

    if args.api {
        run_api_server(args.port, services, settings).await
    } else {
        run_cli_mode(services, settings).await
    }
}

fn initial_settings(args: &Args, models: &[String]) -> Result<RagSettings, AppError> {
    let mut settings = RagSettings::default();
    let patch = SettingsPatch {
        api_key: args.api_key.clone(),
        model: args.model.clone(),
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
        k_results: args.k_results,
    };
    settings.apply(patch, models).map_err(AppError::ConfigError)?;
    Ok(settings)
}

#[cfg(feature = "qdrant")]
async fn vector_store(qdrant_url: Option<&str>) -> Result<Arc<dyn VectorStore>, AppError> {
    use pdf_rag_chat::database::QdrantVectorDB;

    match qdrant_url {
        Some(url) => {
            let db = QdrantVectorDB::new(url)
                .await
                .map_err(|e| AppError::VectorStoreError(e.to_string()))?;
            info!("Using Qdrant vector store at {}", url);
            Ok(Arc::new(db))
        }
        None => Ok(Arc::new(InMemoryVectorDB::new())),
    }
}

#[cfg(not(feature = "qdrant"))]
async fn vector_store(qdrant_url: Option<&str>) -> Result<Arc<dyn VectorStore>, AppError> {
    if let Some(url) = qdrant_url {
        warn!("Ignoring Qdrant URL {}: built without the `qdrant` feature", url);
    }
    Ok(Arc::new(InMemoryVectorDB::new()))
}

async fn run_cli_mode(services: RagServices, settings: RagSettings) -> Result<(), AppError> {
    if !settings.has_api_key() {
        println!("{}", "No Gemini API key set. Use --api-key, GEMINI_API_KEY or 'set key <key>'.".yellow());
    }

    let mut command_handler = CommandHandler::new(services, settings);

    // Show initial help menu
    print_help();

    // Initialize rustyline editor
    let mut rl = Editor::<(), DefaultHistory>::new()
        .map_err(|e| AppError::TerminalError(e.to_string()))?;

    // Main input loop
    loop {
        match rl.readline("📄 ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match command_handler.handle_command(input).await {
                    Ok(CommandOutcome::Exit) => break,
                    Ok(CommandOutcome::Continue) => {}
                    Err(e) => println!("{}", e.red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(port: u16, services: RagServices, settings: RagSettings) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting API server on {}", addr);

    let app = api::create_api(AppState::new(services, settings));

    let listener = TcpListener::bind(&addr).await
        .map_err(|e| AppError::ServerError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Server bound to {}, ready to accept connections", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::ServerError(e.to_string()))?;

    Ok(())
}
