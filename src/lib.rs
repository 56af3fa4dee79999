//! # Marquee
//!
//! A small movie catalog service. Movies are fetched from OMDb by title,
//! normalized, and stored in SQLite; users attach comments to them; and a
//! ranking endpoint lists the most commented movies in a date range.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │   OMDb   │──▶│  Normalizer  │──▶│  SQLite  │
//! │ (reqwest)│   │ (core crate) │   │  (sqlx)  │
//! └──────────┘   └──────────────┘   └────┬─────┘
//!                                        │
//!                    ┌───────────────────┤
//!                    ▼                   ▼
//!               ┌──────────┐       ┌──────────┐
//!               │   CLI    │       │   HTTP   │
//!               │(marquee) │       │  (axum)  │
//!               └──────────┘       └──────────┘
//! ```
//!
//! Domain logic (normalization, ranking, pagination, catalog operations)
//! lives in `marquee-core`; this crate supplies the runtime pieces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite [`Store`](marquee_core::store::Store) |
//! | [`omdb`] | OMDb [`MovieSource`](marquee_core::source::MovieSource) |
//! | [`server`] | HTTP API |
//! | [`fetch`], [`comment`], [`top`] | CLI commands |

pub mod comment;
pub mod config;
pub mod db;
pub mod fetch;
pub mod logging;
pub mod migrate;
pub mod omdb;
pub mod server;
pub mod sqlite_store;
pub mod top;
