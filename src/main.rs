//! Entry point: load configuration, open the database, bootstrap the
//! application context, start the background task scheduler, then run the
//! pingora dispatcher and the admin listener side by side until shutdown.

use llm_gateway::app::AppContext;
use llm_gateway::dispatcher::GatewayServer;
use llm_gateway::logging::{self, LogComponent, LogStage};
use llm_gateway::{config, database, linfo, lerror};
use std::sync::Arc;

#[tokio::main]
async fn main() -> llm_gateway::Result<()> {
    logging::init_logging(None);

    let config = Arc::new(config::load_config()?);
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Config,
        "config_loaded",
        "configuration loaded",
        host = %config.server.host,
        port = config.server.port,
        admin_port = config.server.admin_port
    );

    let db = database::init_database(&config.database.url).await?;
    database::run_migrations(&db).await?;
    if let Err(e) = database::check_database_status(&db).await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "db_status_check_failed",
            "database status check failed",
            error = %e
        );
    }
    let database = Arc::new(db);

    let app_context = AppContext::bootstrap(config.clone(), database).await?;
    app_context.tasks().scheduler().start_all().await?;

    let proxy_thread = GatewayServer::spawn_proxy(&config, app_context.services())?;

    tokio::select! {
        result = GatewayServer::serve_admin(&config, app_context.services().clone()) => {
            if let Err(e) = result {
                lerror!(
                    "system",
                    LogStage::Shutdown,
                    LogComponent::Admin,
                    "admin_server_error",
                    "admin listener exited with an error",
                    error = %e
                );
            }
        }
        ctrl_c = tokio::signal::ctrl_c() => {
            if let Err(e) = ctrl_c {
                lerror!(
                    "system",
                    LogStage::Shutdown,
                    LogComponent::Admin,
                    "ctrl_c_wait_failed",
                    "failed to wait for shutdown signal",
                    error = %e
                );
            }
            linfo!(
                "system",
                LogStage::Shutdown,
                LogComponent::Admin,
                "shutdown_requested",
                "shutdown signal received"
            );
        }
    }

    app_context.tasks().scheduler().shutdown().await?;

    // `Server::run_forever` never returns and exposes no graceful-stop hook;
    // the dispatcher thread is reclaimed by process exit rather than joined.
    drop(proxy_thread);

    Ok(())
}
