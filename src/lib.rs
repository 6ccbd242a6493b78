//! # News Timeline
//!
//! Keyword-driven news classification and date-partitioned storage.
//!
//! Sources produce candidate articles; each batch is deduplicated against a
//! process-wide URL cache, classified against a two-tier keyword index
//! (*legend* figures take precedence over generic *front* topics, anything
//! else is rejected) and written into one SQLite file per calendar day.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────┐   ┌────────────┐   ┌──────────────────┐
//! │  Sources    │──▶│  Dedup  │──▶│ Classifier │──▶│ timeline_DATE    │
//! │ (registry)  │   │  cache  │   │ legend >   │   │   .sqlite        │
//! └─────────────┘   └─────────┘   │ front      │   └──────────────────┘
//!                                 └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! timeline init                     # create today's partition
//! timeline sync all                 # ingest every configured source
//! timeline list --date 2026-01-05   # read a day back
//! timeline reset --date 2026-01-05  # wipe a day
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | The `Article` record |
//! | [`keywords`] | Keyword index and its lazy, reloadable holder |
//! | [`classify`] | Legend/front/reject classification |
//! | [`dedup`] | Process-wide seen-URL cache |
//! | [`store`] | Daily SQLite partitions |
//! | [`content`] | Article content files |
//! | [`traits`] | `NewsSource` trait and source registry |
//! | [`source_json`] | Built-in JSON file source |
//! | [`ingest`] | Ingest pipeline |
//! | [`admin`] | Day reset |
//! | [`error`] | Store and source error types |

pub mod admin;
pub mod classify;
pub mod config;
pub mod content;
pub mod dedup;
pub mod error;
pub mod get;
pub mod ingest;
pub mod keywords;
pub mod keywords_cmd;
pub mod models;
pub mod source_json;
pub mod sources;
pub mod stats;
pub mod store;
pub mod traits;
