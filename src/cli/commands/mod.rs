use anyhow::Result;

pub mod create_admin;
pub mod init_config;
pub mod migrate;
pub mod serve;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
