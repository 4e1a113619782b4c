use anyhow::Result;
use tracing::info;

use crate::db;

pub async fn execute(db_url: &str) -> Result<()> {
    let (url, _storage) = db::open(db_url).await?;
    info!(%url, "migrations applied");
    println!("Database ready at {url}");
    Ok(())
}
