use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use super::Command;
use crate::api::{start_server, AppState};
use crate::auth::TokenIssuer;
use crate::config::config;
use crate::database::DatabaseManager;
use crate::shutdown::shutdown_all_services;
use crate::storage::LocalFileStore;

pub struct ServeCommand {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let config = config()?;
        let tokens = TokenIssuer::new(config.jwt_secret()?, config.auth.token_ttl_minutes);

        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let database = DatabaseManager::new(&config.database).await?;
        let store = LocalFileStore::new(&config.storage.upload_dir)
            .await
            .with_context(|| format!("cannot use upload dir {}", config.storage.upload_dir))?;
        info!(upload_dir = %config.storage.upload_dir, "Document storage ready");

        let state = Arc::new(AppState::new(
            database.pool().clone(),
            Arc::new(store),
            tokens,
            config.storage.max_upload_bytes,
        ));
        let metrics = state.metrics.clone();

        let result = start_server(state, addr, config.server.cors_origin.as_deref()).await;
        shutdown_all_services(&database, &metrics).await;
        result
    }
}
