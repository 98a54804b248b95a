use crate::cli::Args;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const INSECURE_SESSION_SECRET: &str = "a_super_secret_key_that_should_be_changed_in_production";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

/// Everything the process needs, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: SocketAddr,
    pub database_path: PathBuf,
    pub gemini: GeminiConfig,
    pub session_secret: String,
    pub tls: Option<TlsConfig>,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let gemini = gemini_config(args)?;

        let server_addr = args.server_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidAddress(args.server_addr.clone(), e))?;

        let session_secret = match args.session_secret.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => INSECURE_SESSION_SECRET.to_string(),
        };

        let tls = if args.enable_tls {
            match (&args.tls_cert_path, &args.tls_key_path) {
                (Some(cert_path), Some(key_path)) =>
                    Some(TlsConfig {
                        cert_path: cert_path.clone(),
                        key_path: key_path.clone(),
                    }),
                _ => {
                    return Err(ConfigError::IncompleteTls);
                }
            }
        } else {
            None
        };

        Ok(Self {
            server_addr,
            database_path: PathBuf::from(&args.database_path),
            gemini,
            session_secret,
            tls,
        })
    }

    pub fn uses_insecure_secret(&self) -> bool {
        self.session_secret == INSECURE_SESSION_SECRET
    }
}

/// Only the completion-service settings; enough for `list-models`.
pub fn gemini_config(args: &Args) -> Result<GeminiConfig, ConfigError> {
    let api_key = args.gemini_api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(ConfigError::MissingApiKey)?
        .to_string();

    Ok(GeminiConfig {
        api_key,
        model: normalize_model_name(&args.gemini_model),
        base_url: args.gemini_base_url.trim_end_matches('/').to_string(),
    })
}

pub fn normalize_model_name(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["chat-relay"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let mut args = parse(&[]);
        args.gemini_api_key = None;
        assert!(matches!(AppConfig::from_args(&args), Err(ConfigError::MissingApiKey)));

        args.gemini_api_key = Some("   ".into());
        assert!(matches!(AppConfig::from_args(&args), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn resolves_defaults_with_api_key() {
        let mut args = parse(&["--gemini-api-key", "abc", "--server-addr", "127.0.0.1:8080"]);
        args.session_secret = None;
        args.enable_tls = false;
        let config = AppConfig::from_args(&args).unwrap();

        assert_eq!(config.gemini.api_key, "abc");
        assert_eq!(config.server_addr.port(), 8080);
        assert!(config.uses_insecure_secret());
        assert!(config.tls.is_none());
    }

    #[test]
    fn explicit_session_secret_is_kept() {
        let mut args = parse(&["--gemini-api-key", "abc"]);
        args.server_addr = "127.0.0.1:5000".into();
        args.session_secret = Some("s3cret".into());
        args.enable_tls = false;
        let config = AppConfig::from_args(&args).unwrap();
        assert_eq!(config.session_secret, "s3cret");
        assert!(!config.uses_insecure_secret());
    }

    #[test]
    fn invalid_address_is_rejected() {
        let mut args = parse(&["--gemini-api-key", "abc"]);
        args.server_addr = "not-an-address".into();
        assert!(matches!(AppConfig::from_args(&args), Err(ConfigError::InvalidAddress(_, _))));
    }

    #[test]
    fn tls_requires_both_paths() {
        let mut args = parse(&["--gemini-api-key", "abc"]);
        args.server_addr = "127.0.0.1:5000".into();
        args.enable_tls = true;
        args.tls_cert_path = Some("cert.pem".into());
        args.tls_key_path = None;
        assert!(matches!(AppConfig::from_args(&args), Err(ConfigError::IncompleteTls)));

        args.tls_key_path = Some("key.pem".into());
        let config = AppConfig::from_args(&args).unwrap();
        assert_eq!(config.tls.unwrap().key_path, "key.pem");
    }

    #[test]
    fn model_names_are_prefixed() {
        assert_eq!(normalize_model_name("gemma-3-4b-it"), "models/gemma-3-4b-it");
        assert_eq!(normalize_model_name("models/gemini-1.5-flash"), "models/gemini-1.5-flash");
    }
}
