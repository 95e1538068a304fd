//! `tutor_core`: the bilingual (English/Japanese) self-study tutor's
//! adaptive review scheduler and learning-state engine.
//!
//! Layered per the component map: `domain` holds the shared data model,
//! `scheduler` is the pure spaced-repetition algorithm, `store` is the
//! persistence layer, `session`/`assessment`/`ingest` are the three
//! higher-level engines, and `service` is the single transport-neutral
//! surface (`ServiceApi`) that `routes` exposes over HTTP and `bin/cli.rs`
//! drives from the command line.

pub mod assessment;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod response;
pub mod routes;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod state;
pub mod store;
