use anyhow::{bail, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use super::Command;
use crate::auth::hash_password_async;
use crate::config::config;
use crate::database::DatabaseManager;
use crate::domain::Role;
use crate::store::employees::{self, NewEmployee};
use crate::validation::{is_valid_email, normalize_email};

const MIN_PASSWORD_LEN: usize = 8;

pub struct CreateAdminCommand {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
}

async fn prompt_password() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Password: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

impl Command for CreateAdminCommand {
    async fn execute(&self) -> Result<()> {
        let email = normalize_email(&self.email);
        if !is_valid_email(&email) {
            bail!("invalid email address '{}'", self.email);
        }
        let name = self.name.trim();
        if name.is_empty() {
            bail!("--name must not be empty");
        }

        let password = match &self.password {
            Some(password) => password.clone(),
            None => prompt_password().await?,
        };
        if password.chars().count() < MIN_PASSWORD_LEN {
            bail!("password must have at least {MIN_PASSWORD_LEN} characters");
        }
        let password_hash = hash_password_async(password).await?;

        let manager = DatabaseManager::new(&config()?.database).await?;
        let mut conn = manager.pool().acquire().await?;
        let id = employees::upsert_by_email(
            &mut conn,
            NewEmployee {
                full_name: name,
                email: &email,
                password_hash: &password_hash,
                role: Role::Admin,
                now: Utc::now(),
            },
        )
        .await?;
        drop(conn);
        manager.shutdown().await;

        info!(employee_id = id, "Administrator account ready");
        println!("Administrator {email} ready (id {id})");
        Ok(())
    }
}
