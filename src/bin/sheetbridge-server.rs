//! SheetBridge Server
//!
//! Serves the configured workbook tables over HTTP. Configuration is read from
//! `$SHEETBRIDGE_CONFIG` (default `sheetbridge.toml`); `HOST` and `PORT`
//! override the listen address.

use sheetbridge::config::Config;
use sheetbridge::server::run_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("{}", e);
        std::io::Error::other(e.to_string())
    })?;

    run_server(config).await
}
