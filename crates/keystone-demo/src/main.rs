//! Keystone demo - entry point
//!
//! Runs the count service with the standard Keystone bootstrap.

use keystone::prelude::*;
use keystone_demo::{CountService, DEFAULT_PASSTHROUGH, PASSTHROUGH};
use tracing::info;

#[tokio::main]
async fn main() {
    let mut registry = default_config();
    registry.add_string(PASSTHROUGH, DEFAULT_PASSTHROUGH);
    registry.set_default("port", 9999);

    let config = match ConfigLoader::new(registry).with_dotenv().load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("keystone-demo: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config).await {
        eprintln!("keystone-demo: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let mut service = CountService::new(config.try_get_string(PASSTHROUGH)?)?;

    let Setup::Serve(server) = standard_setup(config, &mut service)? else {
        return Ok(());
    };

    let shutdown = ShutdownSignal::new();
    let logger = service.logger();
    let watcher = watch_signals(
        SignalHandlers::new()
            .on_interrupt(fatal_callback(logger.clone(), "SIGINT", shutdown.clone()))
            .on_terminate(fatal_callback(logger, "SIGTERM", shutdown.clone())),
    )?;
    shutdown_on_terminate(watcher, shutdown.clone());

    info!(
        version = keystone_demo::VERSION,
        passthrough = service.passthrough_url(),
        "starting keystone demo"
    );
    server.run_with_shutdown(shutdown).await?;
    Ok(())
}
