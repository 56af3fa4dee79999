use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use tempfile::TempDir;

fn marquee_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("marquee");
    path
}

fn write_config(root: &Path, omdb: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/marquee.sqlite"

[server]
bind = "127.0.0.1:0"

{}
"#,
        root.display(),
        omdb
    );

    let config_path = config_dir.join("marquee.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "[omdb]\napi_key = \"test-key\"");
    (tmp, config_path)
}

fn run_marquee(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = marquee_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OMDB_API_KEY")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run marquee binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_marquee(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("marquee.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    // Run init twice
    let (_, _, success1) = run_marquee(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_marquee(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_marquee(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr={}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "[top]\nlimit = 0");
    let (_, stderr, success) = run_marquee(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("top.limit"), "stderr={}", stderr);
}

#[test]
fn test_top_empty_range() {
    let (_tmp, config_path) = setup_test_env();
    run_marquee(&config_path, &["init"]);

    let (stdout, stderr, success) = run_marquee(
        &config_path,
        &["top", "--after", "2024-01-01", "--before", "2024-01-31"],
    );
    assert!(success, "top failed: stderr={}", stderr);
    assert!(stdout.contains("No comments between 2024-01-01 and 2024-01-31."));
}

#[test]
fn test_top_rejects_malformed_date() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_marquee(
        &config_path,
        &["top", "--after", "01/01/2024", "--before", "2024-01-31"],
    );
    assert!(!success);
    assert!(stderr.contains("date_after"), "stderr={}", stderr);
}

#[test]
fn test_comment_on_unknown_movie_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_marquee(&config_path, &["init"]);

    let (_, stderr, success) = run_marquee(&config_path, &["comment", "tt404", "hello"]);
    assert!(!success);
    assert!(stderr.contains("Invalid pk \"tt404\""), "stderr={}", stderr);
}

#[test]
fn test_fetch_requires_api_key() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "");

    let (_, stderr, success) = run_marquee(&config_path, &["fetch", "Heat"]);
    assert!(!success);
    assert!(stderr.contains("OMDB_API_KEY"), "stderr={}", stderr);
}

/// fetch → comment → top through the binary, against a local OMDb stand-in.
#[tokio::test]
async fn test_fetch_comment_top_roundtrip() {
    let app = Router::new().route(
        "/",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            let body = if q.get("t").map(String::as_str) == Some("Heat") {
                json!({
                    "Title": "Heat", "Year": "1995", "Rated": "R",
                    "Released": "15 Dec 1995", "Runtime": "170 min",
                    "Genre": "Action, Crime, Drama", "Director": "Michael Mann",
                    "Writer": "Michael Mann", "Actors": "Al Pacino, Robert De Niro",
                    "Plot": "A group of high-end professional thieves.",
                    "Language": "English, Spanish", "Country": "USA",
                    "Awards": "14 nominations.", "Poster": "N/A", "Ratings": [],
                    "Metascore": "76", "imdbRating": "8.3", "imdbVotes": "570,021",
                    "imdbID": "tt0113277", "Type": "movie", "DVD": "27 Jul 1999",
                    "BoxOffice": "N/A", "Production": "Warner Bros.", "Website": "N/A",
                    "Response": "True"
                })
            } else {
                json!({"Response": "False", "Error": "Movie not found!"})
            };
            Json(body)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let omdb = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let tmp = TempDir::new().unwrap();
    let config_path = write_config(
        tmp.path(),
        &format!(
            "[omdb]\nbase_url = \"http://{}\"\napi_key = \"test-key\"",
            addr
        ),
    );

    // The binary blocks; keep the runtime free to serve the stand-in.
    let run = |args: Vec<String>| {
        let config_path = config_path.clone();
        tokio::task::spawn_blocking(move || {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            run_marquee(&config_path, &args)
        })
    };
    let args = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let (stdout, stderr, success) = run(args(&["fetch", "Heat"])).await.unwrap();
    assert!(success, "fetch failed: stderr={}", stderr);
    let movie: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(movie["imdb_id"], "tt0113277");
    assert_eq!(movie["imdb_votes"], 570021);

    let (_, stderr, success) = run(args(&["fetch", "Hate"])).await.unwrap();
    assert!(!success);
    assert!(stderr.contains("Movie not found!"), "stderr={}", stderr);

    let (stdout, stderr, success) = run(args(&["comment", "tt0113277", "Great heist"]))
        .await
        .unwrap();
    assert!(success, "comment failed: stderr={}", stderr);
    let comment: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(comment["movie"], "tt0113277");
    let day = comment["created_at"].as_str().unwrap()[..10].to_string();

    let top_args = args(&["top", "--after", day.as_str(), "--before", day.as_str()]);
    let (stdout, stderr, success) = run(top_args).await.unwrap();
    assert!(success, "top failed: stderr={}", stderr);
    assert!(stdout.contains("tt0113277"), "stdout={}", stdout);

    omdb.abort();
}
