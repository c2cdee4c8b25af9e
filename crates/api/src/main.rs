use anyhow::Context;

use mousedeck_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mousedeck_observability::init();

    let config = ApiConfig::from_env().context("invalid server configuration")?;
    mousedeck_api::server::run(config).await
}
