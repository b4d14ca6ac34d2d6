//! KAT Scheduler - per-organisation task scheduling core
//!
//! Ranks and schedules boefje and normalizer jobs onto priority queues,
//! dispatches them to the remote worker fabric, and exposes an HTTP admin
//! surface for introspecting and manually operating those queues. Every
//! queue, cache entry, and scheduler loop is scoped to one organisation;
//! the [`app::Supervisor`] is what fans a single process out across all of
//! them and keeps that fleet in sync with the plugin catalogue.

pub mod admin;
pub mod app;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod listener;
pub mod queue;
pub mod ranker;
pub mod retry;
pub mod scheduler;
pub mod services;

pub use app::{SchedulerError, Supervisor};
pub use config::Config;
