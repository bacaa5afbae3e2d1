// SPDX-License-Identifier: GPL-2.0-only
//! Error kinds surfaced by the mediation core: `Invalid`, `Denied`,
//! `NoMemory`, `Busy`, `Cancelled`, `NotReady`, `NoData`. Propagation policy
//! lives with the callers (e.g. cache-insert failures are swallowed, not
//! surfaced) — this enum only names the kinds.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Malformed identifier, category too long, or an unparseable write
    /// payload.
    #[error("invalid input: {0}")]
    Invalid(&'static str),

    /// A policy decision, or a cross-cell access check, came back negative.
    #[error("denied by policy")]
    Denied,

    /// Allocation failure while building a request or cache entry.
    #[error("allocation failed")]
    NoMemory,

    /// A second process attempted to attach as host while one is already
    /// attached.
    #[error("host channel already attached")]
    Busy,

    /// The caller was interrupted during a blocking wait.
    #[error("operation cancelled")]
    Cancelled,

    /// The module has not finished initializing, or a host is required but
    /// absent.
    #[error("not ready")]
    NotReady,

    /// Internal: cache miss, or no resolved response yet.
    #[error("no data")]
    NoData,
}
