use anyhow::Result;
use dv_status_check::utils::logging;
use dv_status_check::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // config first, it decides the log level
    let config = Config::load()?;

    logging::init(config.verbose_logging);

    App::initialize(config).await?.run().await?;

    Ok(())
}
