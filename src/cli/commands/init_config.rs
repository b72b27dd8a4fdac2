use anyhow::{bail, Result};
use std::path::Path;

use super::Command;
use crate::config::PermitsConfig;

pub struct InitConfigCommand {
    pub path: String,
    pub force: bool,
}

impl Command for InitConfigCommand {
    async fn execute(&self) -> Result<()> {
        if Path::new(&self.path).exists() && !self.force {
            bail!("{} already exists (use --force to overwrite)", self.path);
        }
        PermitsConfig::default().save_to_file(&self.path)?;
        println!("Wrote default configuration to {}", self.path);
        println!("Set auth.jwt_secret (or PERMITS_AUTH__JWT_SECRET) before serving.");
        Ok(())
    }
}
