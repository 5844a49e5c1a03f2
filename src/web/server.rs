//! Web server for msgdrive.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::auth::{CredentialIssuer, IdentityGate};
use crate::config::Config;
use crate::drive::Drive;
use crate::{DriveError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// How often stale cancellation marks are swept.
const CANCEL_SWEEP_INTERVAL_SECS: u64 = 600;

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    issuer: Arc<CredentialIssuer>,
    cors_origins: Vec<String>,
    max_upload_bytes: u64,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, drive: Arc<Drive>, gate: Arc<IdentityGate>) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| DriveError::Config(format!("invalid server address: {}", e)))?;

        let issuer = gate.issuer().clone();

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(drive, gate)),
            issuer,
            cors_origins: config.server.cors_origins.clone(),
            max_upload_bytes: config.server.max_upload_bytes(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Full router: API plus health check.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.issuer.clone(),
            &self.cors_origins,
            self.max_upload_bytes,
        )
        .merge(create_health_router())
    }

    /// Sweep expired upload cancellation marks.
    fn start_cancel_sweep_task(drive: Arc<Drive>) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(CANCEL_SWEEP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let count = drive.uploads().prune_expired();
                if count > 0 {
                    tracing::info!(expired_count = count, "Dropped stale cancellation marks");
                } else {
                    tracing::debug!("No stale cancellation marks");
                }
            }
        });
    }

    async fn bind(self) -> Result<(TcpListener, Router, SocketAddr)> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cancel_sweep_task(self.app_state.drive.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        Ok((listener, router, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> Result<()> {
        let (listener, router, _) = self.bind().await?;
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, router, local_addr) = self.bind().await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
