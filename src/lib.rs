pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use agent::ChatAgent;
use cli::{ Args, Command };
use config::AppConfig;
use history::initialize_history_store;
use llm::GeminiChatClient;
use log::{ info, warn };
use server::api::AppState;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Some(Command::ListModels) => list_models(&args).await,
        Some(Command::Serve) | None => serve(&args).await,
    }
}

async fn serve(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::from_args(args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", config.server_addr);
    info!("Database Path: {}", config.database_path.display());
    info!("Chat Model: {}", config.gemini.model);
    info!("API Base URL: {}", config.gemini.base_url);
    info!("TLS Enabled: {}", config.tls.is_some());
    if config.uses_insecure_secret() {
        warn!("Session Secret: insecure placeholder (set SESSION_SECRET)");
    }
    info!("-------------------------");

    let store = initialize_history_store(&config.database_path)?;
    let chat_client = Arc::new(GeminiChatClient::from_config(&config.gemini));
    let agent = Arc::new(ChatAgent::new(chat_client, store));

    let server = Server::new(config, AppState::new(agent));
    server.run().await?;

    Ok(())
}

async fn list_models(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let gemini = config::gemini_config(args)?;
    let client = GeminiChatClient::from_config(&gemini);
    println!("Configured Gemini API. Attempting to list models...");

    let models = client.list_models().await.map_err(|e| {
        format!("An error occurred while listing models: {}", e)
    })?;
    if models.is_empty() {
        println!("No models found that support 'generateContent' with your API key.");
    }
    for m in &models {
        println!("  Model name: {}, Display name: {}", m.name, m.display_name);
    }

    Ok(())
}
