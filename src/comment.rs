//! `marquee comment <imdb_id> <text>`.

use anyhow::Result;

use marquee_core::catalog;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_comment(config: &Config, movie: &str, text: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = catalog::add_comment(&store, Some(movie), Some(text)).await;
    store.close().await;

    let comment = result?;
    println!("{}", serde_json::to_string_pretty(&comment)?);
    Ok(())
}
