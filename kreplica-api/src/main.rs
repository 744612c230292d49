//! kreplica server entry point.

use clap::Parser;
use kreplica_api::telemetry::init_tracing;
use kreplica_api::{server, ApiResult, ServerConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ServerConfig::parse();
    init_tracing(config.verbose)?;

    if let Err(e) = server::run(config).await {
        tracing::error!(error = %e.message, "Server failed");
        return Err(e);
    }
    Ok(())
}
