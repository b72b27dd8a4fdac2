use anyhow::Result;

use super::Command;
use crate::config::config;
use crate::database::DatabaseManager;

pub struct MigrateCommand;

impl Command for MigrateCommand {
    async fn execute(&self) -> Result<()> {
        let mut database = config()?.database.clone();
        // Run explicitly below instead of on connect
        database.auto_migrate = false;

        let manager = DatabaseManager::new(&database).await?;
        manager.migrate().await?;
        manager.shutdown().await;
        println!("Migrations applied to {}", database.url);
        Ok(())
    }
}
