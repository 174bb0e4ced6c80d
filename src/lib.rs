//! # Paper Scout
//!
//! Session-aware semantic search over research papers.
//!
//! Paper Scout stores papers and their embeddings in SQLite, serves exact
//! inner-product search from an in-memory index, and re-ranks results using
//! an exponentially decayed history of the session's past queries — so a
//! conversation that has been circling "graph neural networks" surfaces
//! related papers a little higher without ever burying a strong raw match.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────────┐
//! │  Ingest  │──▶│  SQLite   │──▶│  FlatIndex    │
//! │  (JSON)  │   │ papers+vec│   │  (in-memory)  │
//! └──────────┘   └───────────┘   └──────┬────────┘
//!                                       │ candidates
//!                 ┌──────────────┐      ▼
//!     query ─────▶│ ContextEngine│─▶ rerank ─▶ ranked results
//!                 │ (per session)│
//!                 └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pscout init                          # create database
//! pscout ingest papers.json            # load a paper corpus
//! pscout search "adversarial examples"
//! pscout chat                          # interactive session with context
//! pscout serve                         # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`context`] | Decayed query-history engine (per session) |
//! | [`rerank`] | Context-weighted score blending |
//! | [`index`] | In-memory flat inner-product index |
//! | [`session`] | Session → context engine registry |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`ingest`] | Paper corpus import |
//! | [`get`] | Paper retrieval by id |
//! | [`search`] | CLI search and chat orchestration |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod get;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod rerank;
pub mod search;
pub mod server;
pub mod session;
pub mod stats;
