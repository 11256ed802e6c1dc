//! # Batch Coder
//!
//! Batch submission of clinical documents to a remote coding service, with
//! per-document tracking and analytics over the coded results.
//!
//! Documents come in as single files, folder trees or ZIP archives and are
//! normalized into one set of virtual files keyed by logical path. The
//! dispatcher sends one request per document in fixed-size concurrent
//! windows, every response (or failure) becomes exactly one canonical row,
//! and the drained batch is decomposed into per-code facts for analytics and
//! export.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐   ┌────────────┐
//! │ Ingest       │──▶│ Dispatch    │──▶│ Normalize    │──▶│ Analytics  │
//! │ file/dir/zip │   │ windows of N│   │ canonical row│   │ facts+stats│
//! └──────────────┘   └──────┬──────┘   └──────────────┘   └─────┬──────┘
//!                           │                                   │
//!                           ▼                                   ▼
//!                    ┌─────────────┐                      ┌────────────┐
//!                    │ Remote HTTP │                      │  Export    │
//!                    │  service    │                      │ csv/xlsx/  │
//!                    └─────────────┘                      │ json       │
//!                                                         └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bcoder scan ./handouts batch.zip            # what would be sent
//! bcoder run ./handouts batch.zip             # process and export
//! bcoder analyze exports/coding_results_20250101_120000_000_1f0c2a9e.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Virtual files, item states, result rows |
//! | [`fileset`] | Deduplicated working set with extension allow-list |
//! | [`ingest`] | Files, folders and archives → virtual files |
//! | [`archive`] | ZIP expansion and entry policy |
//! | [`client`] | Remote analysis boundary |
//! | [`dispatch`] | Windowed bounded-concurrency scheduler |
//! | [`normalize`] | Response → canonical row |
//! | [`batch`] | Owned batch aggregate and counters |
//! | [`progress`] | Batch progress events and reporters |
//! | [`analytics`] | Code facts, categories, tiers, summaries |
//! | [`export`] | CSV, XLSX and JSON sinks |
//! | [`report`] | Terminal summaries |
//! | [`error`] | Error taxonomy |
//! | [`logging`] | Tracing subscriber setup |

pub mod analytics;
pub mod archive;
pub mod batch;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod fileset;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod report;
