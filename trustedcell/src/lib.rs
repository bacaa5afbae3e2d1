// SPDX-License-Identifier: GPL-2.0-only
//! Mediation core for the TrustedCell mandatory access-control module.
//!
//! This crate implements the decision cache, request/response queue, host
//! session lease, decision orchestrator and credential adapter. It has no
//! knowledge of the kernel/LSM hook points or the `securityfs` plumbing a
//! host binary wraps around it — those consume this crate's public API
//! (`Orchestrator`, `CredentialAdapter`, `HostSession`, and the line codec
//! in [`interface`]) rather than being part of it.

pub mod cache;
pub mod credential;
pub mod fingerprint;
pub mod interface;
pub mod orchestrator;
pub mod queue;
pub mod session;

pub use cache::{Decision, DecisionCache};
pub use credential::{CredSecurity, CredentialAdapter};
pub use fingerprint::Fingerprint;
pub use orchestrator::Orchestrator;
pub use queue::{CancelToken, Request, RequestQueue};
pub use session::HostSession;

pub use trustedcell_common::{CellId, Error, Metrics, Result};
