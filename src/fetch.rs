//! One-shot movie fetch for `marquee fetch <title>`.

use anyhow::Result;

use marquee_core::catalog;

use crate::config::Config;
use crate::omdb::OmdbClient;
use crate::sqlite_store::SqliteStore;

/// Look `title` up on OMDb, store it, and print the stored movie as JSON.
pub async fn run_fetch(config: &Config, title: &str) -> Result<()> {
    let source = OmdbClient::new(&config.omdb)?;
    let store = SqliteStore::open(config).await?;

    let result = catalog::fetch_movie(&source, &store, title).await;
    store.close().await;

    let movie = result?;
    println!("{}", serde_json::to_string_pretty(&movie)?);
    Ok(())
}
