use loadgun::*;

use error::ConfigError;

fn main() -> anyhow::Result<()> {
    let config = match cli::parse() {
        Ok(config) => config,
        Err(ConfigError::Args(e)) => e.exit(),
    };

    telemetry::init_tracing();
    launcher::run(config)?;

    Ok(())
}
