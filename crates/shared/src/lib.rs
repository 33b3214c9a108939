//! Geogrid engine for local rank tracking: lattice generation around a
//! business, rank classification and the summary metrics (AGR, ATGR, SoLV)
//! shown on the dashboard.
//!
//! Everything here is pure and synchronous.

pub mod compare;
pub mod error;
pub mod export;
pub mod grid;
pub mod metrics;
pub mod models;
pub mod rank;
