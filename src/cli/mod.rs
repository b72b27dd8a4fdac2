use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "permits")]
#[command(about = "Controlled-substances permit workflow service")]
#[command(long_about = "Runs the permit request API used by applicants and Ministry of Health staff \
                       (Ventanilla, UPC, Dirección, DNCD), and manages its database.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Create an administrator account, or reset an existing one
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Prompted on stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Write a permits.toml with the default settings
    InitConfig {
        #[arg(long, default_value = "permits.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
