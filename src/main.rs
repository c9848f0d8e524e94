use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use tenant_proxy::lifecycle::startup;

#[derive(Parser)]
#[command(name = "tenant-proxy")]
#[command(about = "Tenant-isolating reverse proxy between Grafana and Prometheus", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long = "conf", default_value = "./config.toml")]
    conf: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging is not up until the config is loaded, so these go to stderr.
    let config = match startup::init(&cli.conf) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tenant-proxy: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    tracing::info!("tenant-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    match startup::serve(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Proxy stopped");
            ExitCode::from(e.exit_code())
        }
    }
}
