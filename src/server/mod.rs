pub mod api;

use crate::config::AppConfig;
use api::{ build_router, AppState };
use log::info;
use std::error::Error;

pub struct Server {
    config: AppConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.config.server_addr;
        let app = build_router(self.state.clone());

        match &self.config.tls {
            Some(tls) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    tls.cert_path,
                    tls.key_path
                );
                let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                    &tls.cert_path,
                    &tls.key_path
                ).await?;

                info!("HTTPS server listening on: https://{}", addr);
                axum_server::bind_rustls(addr, tls_config)
                    .serve(app.into_make_service())
                    .await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e|
                    format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
                )?;
                info!("HTTP server listening on: http://{}", addr);
                axum::serve(listener, app.into_make_service()).await?;
            }
        }

        Ok(())
    }
}
