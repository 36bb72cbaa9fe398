use std::sync::Arc;

use cache_cluster_admin::{
    build_app,
    cluster_client::PowerShellClusterClient,
    config::Config,
    logging,
    powershell::{PowerShellRunner, PsSession},
    AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(logging::SERVICE_LOG_FILTER);

    let config = Config::from_env()?;
    let runner = Arc::new(PowerShellRunner::new(config.powershell_path.clone()));
    let session = PsSession::new(config.config_provider.clone(), config.connection_string.clone());
    let client = Arc::new(PowerShellClusterClient::new(
        runner,
        session,
        config.counters.clone(),
    ));

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(
        config.users_token.clone(),
        config.administrators_token.clone(),
        client.clone(),
        client.clone(),
        client,
    );
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        powershell = %config.powershell_path,
        administrators_enabled = config.administrators_token.is_some(),
        "cache administration service starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
