use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database file and schema. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    ensure_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    // List fields (genre, language, country) and ratings hold JSON text.
    // Dates are stored as YYYY-MM-DD so they sort chronologically.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            imdb_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            year INTEGER NOT NULL,
            rated TEXT NOT NULL,
            released TEXT NOT NULL,
            runtime TEXT NOT NULL,
            genre TEXT NOT NULL,
            director TEXT NOT NULL,
            writer TEXT NOT NULL,
            actors TEXT NOT NULL,
            plot TEXT NOT NULL,
            language TEXT NOT NULL,
            country TEXT NOT NULL,
            awards TEXT NOT NULL,
            poster TEXT NOT NULL,
            ratings TEXT NOT NULL DEFAULT '[]',
            metascore INTEGER NOT NULL,
            imdb_rating TEXT NOT NULL,
            imdb_votes INTEGER NOT NULL,
            type TEXT NOT NULL,
            dvd TEXT NOT NULL,
            box_office TEXT NOT NULL,
            production TEXT NOT NULL,
            website TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // created_at is unix seconds (UTC)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            movie_id TEXT NOT NULL REFERENCES movies(imdb_id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_movie_id ON comments(movie_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_created_at ON comments(created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_movies_title ON movies(title)")
        .execute(pool)
        .await?;

    Ok(())
}
