//! # Marquee Core
//!
//! Runtime-free domain logic for Marquee: movie and comment models,
//! normalization of OMDb records, comment ranking, pagination, and the
//! storage and movie-source abstractions.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! The application crate provides the SQLite store, the OMDb client, and
//! the HTTP surface on top of the traits defined here.

pub mod catalog;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod ranking;
pub mod source;
pub mod store;
pub mod validation;
