use anyhow::Result;
use tracing::{debug, info, trace};

use super::initdb::migrate;
use super::serve::run_server;
use crate::config::AppConfig;

pub async fn migrate_and_serve(config: AppConfig) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", config.database_url);
    debug!("Bind address: {}", config.bind_address);

    let db = migrate(&config.database_url).await?;
    // The server opens its own pool.
    db.close().await?;

    run_server(config).await
}
