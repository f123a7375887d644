//! Core types and the change-log engine for the taxi-stand registry.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.
//!
//! The engine has three pure parts:
//!
//! - [`derive`] compares two [`Stand`](stand::Stand) snapshots and produces
//!   field-level [`ChangeRecord`](change::ChangeRecord)s.
//! - [`group`] folds a stand's history into [`Transaction`](group::Transaction)s
//!   keyed by decision reference or by manual-save timestamp.
//! - [`reconstruct`] rebuilds a stand as it stood right after a chosen
//!   transaction by undoing every later change.
//!
//! [`revision`] and [`plates`] wire those parts to a [`StandStore`](store::StandStore).

pub mod change;
pub mod derive;
pub mod error;
pub mod group;
pub mod legacy;
pub mod memory;
pub mod plates;
pub mod reconstruct;
pub mod revision;
pub mod stand;
pub mod store;

pub use error::{Error, Result};
