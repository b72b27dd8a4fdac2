use anyhow::Result;
use clap::Parser;

use controlled_permits::cli::commands::create_admin::CreateAdminCommand;
use controlled_permits::cli::commands::init_config::InitConfigCommand;
use controlled_permits::cli::commands::migrate::MigrateCommand;
use controlled_permits::cli::commands::serve::ServeCommand;
use controlled_permits::cli::commands::Command;
use controlled_permits::cli::{Cli, Commands};
use controlled_permits::config::config;
use controlled_permits::telemetry::{init_telemetry, shutdown_telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands still run without logging
    match config() {
        Ok(config) => {
            if let Err(e) = init_telemetry(&config.observability) {
                eprintln!("Warning: failed to initialize telemetry: {e}");
            }
        }
        Err(e) => eprintln!("Warning: {e}"),
    }

    let result = match cli.command {
        Commands::Serve { host, port } => ServeCommand { host, port }.execute().await,
        Commands::Migrate => MigrateCommand.execute().await,
        Commands::CreateAdmin {
            email,
            name,
            password,
        } => {
            CreateAdminCommand {
                email,
                name,
                password,
            }
            .execute()
            .await
        }
        Commands::InitConfig { path, force } => InitConfigCommand { path, force }.execute().await,
    };

    shutdown_telemetry();
    result
}
