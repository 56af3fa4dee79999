//! `marquee top --after DATE --before DATE`: the ranked listing as a table.

use anyhow::Result;

use marquee_core::models::RankedMovieEntry;
use marquee_core::ranking::{self, DateRange};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_top(config: &Config, after: &str, before: &str) -> Result<()> {
    let range = DateRange::from_params(Some(after), Some(before))?;

    let store = SqliteStore::open(config).await?;
    let result = ranking::top_commented(&store, &range, config.top.limit).await;
    store.close().await;

    let entries = result?;
    print!("{}", render_table(&range, &entries));
    Ok(())
}

fn render_table(range: &DateRange, entries: &[RankedMovieEntry]) -> String {
    if entries.is_empty() {
        return format!(
            "No comments between {} and {}.\n",
            range.after, range.before
        );
    }

    let mut out = format!("{:<6}{:<14}{}\n", "RANK", "IMDB ID", "COMMENTS");
    for entry in entries {
        out.push_str(&format!(
            "{:<6}{:<14}{}\n",
            entry.rank, entry.imdb_id, entry.total_comments
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(
            render_table(&range(), &[]),
            "No comments between 2024-01-01 and 2024-01-31.\n"
        );
    }

    #[test]
    fn test_table_rows() {
        let entries = vec![
            RankedMovieEntry {
                imdb_id: "tt0113277".to_string(),
                total_comments: 2,
                rank: 1,
            },
            RankedMovieEntry {
                imdb_id: "tt0078748".to_string(),
                total_comments: 2,
                rank: 1,
            },
        ];
        let table = render_table(&range(), &entries);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "RANK  IMDB ID       COMMENTS");
        assert_eq!(lines[1], "1     tt0113277     2");
        assert_eq!(lines.len(), 3);
    }
}
