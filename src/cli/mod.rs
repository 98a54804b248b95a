use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    // --- Completion Service Args ---
    /// API key for the Gemini generative-language API. Required.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Model used for chat completion (e.g., models/gemma-3-4b-it, gemini-1.5-flash)
    #[arg(long, env = "GEMINI_MODEL", default_value = "models/gemma-3-4b-it")]
    pub gemini_model: String,

    /// Base URL of the generative-language API.
    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_base_url: String,

    // --- Storage Args ---
    /// Path of the SQLite file holding chat history.
    #[arg(long, env = "DATABASE_PATH", default_value = "chat_history.db")]
    pub database_path: String,

    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    /// Secret used to sign browser sessions. Falls back to an insecure placeholder.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP chat server (default).
    Serve,
    /// List the models available to the configured API key that support generateContent.
    ListModels,
}
