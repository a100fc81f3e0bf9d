//! # Ragnet
//!
//! A chat-style backend over ingested documentation repositories.
//!
//! Ragnet serves the JSON API behind the Ragnet web client: mock login and
//! registration, a demo repository catalog, mock ingestion, a keyword-based
//! query answerer, a Discord integration placeholder, and a small SQLite
//! workspace store for organizations, sources, and conversation history.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Client  │──▶│  HTTP (axum) │──▶│ answer/repos  │  fixed data
//! └──────────┘   │ bearer guard │   └───────────────┘
//!                └──────┬───────┘
//!                       ▼
//!                ┌──────────────┐
//!                │    SQLite    │  orgs, sources, conversations
//!                └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragnet init                     # create database
//! ragnet ask "how do I install?"  # try the answerer
//! ragnet serve                    # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`models`] | Wire data types |
//! | [`answer`] | Keyword-matched canned answers |
//! | [`repos`] | Demo repository catalog |
//! | [`auth`] | Mock credentials and bearer guard |
//! | [`ingest`] | Mock ingestion |
//! | [`query`] | Query validation and answering |
//! | [`discord`] | Discord placeholder page and authorize URL |
//! | [`orgs`] | Organizations and sources |
//! | [`conversations`] | Conversation log and analytics |
//! | [`error`] | HTTP error responses |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod auth;
pub mod config;
pub mod conversations;
pub mod db;
pub mod discord;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod orgs;
pub mod query;
pub mod repos;
pub mod server;
