use std::env;

use anyhow::Result;
use tracing::error;

use stuapi::{
    config::{resolve_path, Config},
    logging, setup,
};

#[actix_web::main]
async fn main() -> Result<()> {
    logging::init();

    let path = resolve_path(env::var("CONFIG_PATH").ok(), env::args().skip(1))?;
    let cfg = Config::load(&path)?;

    if let Err(e) = setup::run(cfg).await {
        error!(error = %e, "server stopped with an error");
        return Err(e);
    }
    Ok(())
}
