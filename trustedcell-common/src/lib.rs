// SPDX-License-Identifier: GPL-2.0-only
//! Shared primitives used across the trustedcell mediation core.
//!
//! This crate has no policy logic of its own, only the identity type, error
//! kinds and metrics counters that the rest of the crate family builds on.

pub mod cell;
pub mod error;
pub mod metrics;

pub use cell::CellId;
pub use error::{Error, Result};
pub use metrics::Metrics;
