//! Bootstraps the two listeners this gateway exposes: the pingora
//! transparent-proxy port and the Axum admin port. Grounded in the teacher's
//! `proxy::server::ProxyServer` (`Server::new` -> `http_proxy_service` ->
//! `add_tcp` -> `add_service` -> `run_forever`), split across a dedicated OS
//! thread for pingora's own blocking event loop and the caller's tokio
//! runtime for the admin router — pingora's `run_forever` never returns and
//! drives its own reactor, so it cannot share a thread with the async admin
//! server the way the teacher's single-process, single-listener setup does.

use crate::app::AppServices;
use crate::config::AppConfig;
use crate::dispatcher::admin;
use crate::dispatcher::service::DispatcherService;
use crate::error::{ProxyError, Result};
use pingora_core::prelude::*;
use pingora_core::server::configuration::Opt;
use pingora_proxy::http_proxy_service;
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct GatewayServer;

impl GatewayServer {
    /// Builds the `DispatcherService` and starts the pingora proxy on its
    /// own OS thread, returning a handle the caller can join on shutdown.
    pub fn spawn_proxy(config: &Arc<AppConfig>, services: &Arc<AppServices>) -> Result<JoinHandle<()>> {
        let dispatcher = DispatcherService::new(services, config);

        let opt = Opt::default();
        let mut server = Server::new(Some(opt))
            .map_err(|e| ProxyError::internal_with_source("failed to create pingora server", e))?;

        let mut http_proxy = http_proxy_service(&server.configuration, dispatcher);
        http_proxy.add_tcp(&format!("{}:{}", config.server.host, config.server.port));
        server.add_service(http_proxy);

        let host = config.server.host.clone();
        let port = config.server.port;

        std::thread::Builder::new()
            .name("gateway-dispatcher".to_string())
            .spawn(move || {
                tracing::info!(host = %host, port, "starting pingora dispatcher");
                server.run_forever();
            })
            .map_err(|e| ProxyError::internal_with_source("failed to spawn pingora thread", e))
    }

    /// Serves the admin liveness router on the caller's tokio runtime.
    /// Returns once the listener closes or errors; callers typically race
    /// this against `tokio::signal::ctrl_c()`.
    pub async fn serve_admin(config: &Arc<AppConfig>, services: Arc<AppServices>) -> Result<()> {
        let app = admin::router(services);
        let addr = format!("{}:{}", config.server.host, config.server.admin_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ProxyError::network_with_source(format!("binding admin listener on {addr}"), e))?;

        tracing::info!(%addr, "starting admin listener");
        axum::serve(listener, app)
            .await
            .map_err(|e| ProxyError::internal_with_source("admin server error", e))
    }
}
