// SPDX-License-Identifier: GPL-2.0-only
//! The credential adapter: establishes, propagates and retires cell identity
//! across process lifetime events.
//!
//! `CredSecurity` is deliberately a plain `Clone` struct rather than
//! something mutated in place: a live process credential is never mutated,
//! a replacement is built and installed atomically instead. That
//! replace-don't-mutate discipline is an OS credential-management
//! responsibility this crate doesn't own, but the adapter's own logic —
//! which fields survive duplication, which transition needs host
//! authorization — is exercised here independent of it.

use std::sync::Arc;

use trustedcell_common::{CellId, Error, Result};

use crate::{cache::Decision, orchestrator::Orchestrator};

/// Security-relevant fields carried by a process credential.
#[derive(Debug, Clone)]
pub struct CredSecurity {
    /// The uid observed at the moment this credential's cell was first
    /// assigned. Used as the subject identity for every later decision, so
    /// a `setuid` after assignment never changes the question put to the
    /// host.
    pub initial_uid: u32,
    pub cell: Option<CellId>,
}

impl CredSecurity {
    /// A credential with no cell assigned yet.
    pub fn uncelled(uid: u32) -> Self {
        Self { initial_uid: uid, cell: None }
    }

    /// Credential duplication: a shallow copy, with the `CellId`'s refcount
    /// bumped by `Clone` — there is nothing else to do, since `Arc<str>` is
    /// already the refcounted container this needs.
    pub fn derive(&self) -> Self {
        self.clone()
    }
}

pub struct CredentialAdapter {
    orchestrator: Arc<Orchestrator>,
}

impl CredentialAdapter {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Cell assignment, driven externally through the `me` pseudo-file
    /// write:
    ///
    /// - Validates `new_cell_text`.
    /// - If the credential already carries a cell, and the new text differs
    ///   from it, asks the host whether the transition is authorized via
    ///   `decide(current_uid, current_cell, "~trustedcell", new_cell_text,
    ///   "trustedcell.change_cell")`; a denial rejects the write. A
    ///   self-transition (new text equals the current cell's text) is
    ///   always permitted and never even asks.
    /// - Builds a fresh `CellId` and returns a new `CredSecurity` carrying
    ///   it; the caller (the OS credential-replacement protocol) is
    ///   responsible for committing it atomically.
    ///
    /// `current_uid` is the live uid of the calling process at the moment of
    /// the write — it is only consulted the first time a cell is assigned
    /// (when `current.cell` is `None`), to seed `initial_uid`; once a cell
    /// has been assigned, `initial_uid` is carried forward unchanged even
    /// across further transitions.
    pub fn assign_cell(&self, current: &CredSecurity, current_uid: u32, new_cell_text: &str) -> Result<CredSecurity> {
        let new_cell = CellId::new(new_cell_text)?;

        let initial_uid = match &current.cell {
            Some(existing_cell) => {
                if existing_cell.as_str() != new_cell.as_str() {
                    let decision =
                        self.orchestrator
                            .decide(current.initial_uid, existing_cell, "~trustedcell", new_cell.as_str(), "trustedcell.change_cell")?;
                    if decision == Decision::Deny {
                        return Err(Error::Denied);
                    }
                }
                current.initial_uid
            }
            None => current_uid,
        };

        Ok(CredSecurity { initial_uid, cell: Some(new_cell) })
    }

    /// Process-to-process access check, e.g. for `ptrace`: allowed iff both
    /// credentials are uncelled, or both carry identical
    /// cell text; denied otherwise.
    pub fn access_allowed(a: &CredSecurity, b: &CredSecurity) -> bool {
        match (&a.cell, &b.cell) {
            (None, None) => true,
            (Some(x), Some(y)) => x.as_str() == y.as_str(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{CancelToken, QUEUE_CAPACITY};

    fn adapter() -> (Arc<Orchestrator>, CredentialAdapter) {
        let orchestrator = Arc::new(Orchestrator::new(QUEUE_CAPACITY));
        let adapter = CredentialAdapter::new(orchestrator.clone());
        (orchestrator, adapter)
    }

    #[test]
    fn first_assignment_captures_current_uid() {
        let (_orchestrator, adapter) = adapter();
        let cred = CredSecurity::uncelled(0);
        let cred = adapter.assign_cell(&cred, 1000, "alpha").unwrap();
        assert_eq!(cred.initial_uid, 1000);
        assert_eq!(cred.cell.unwrap().as_str(), "alpha");
    }

    #[test]
    fn self_transition_is_always_permitted() {
        let (orchestrator, adapter) = adapter();
        let cred = adapter.assign_cell(&CredSecurity::uncelled(0), 1000, "alpha").unwrap();

        // No worker answers the host channel; a real transition would block here
        // forever, so a self-transition must never call `decide`.
        let cred = adapter.assign_cell(&cred, 1000, "alpha").unwrap();
        assert_eq!(cred.initial_uid, 1000);
        drop(orchestrator);
    }

    #[test]
    fn denied_transition_is_rejected() {
        let (orchestrator, adapter) = adapter();
        let cred = adapter.assign_cell(&CredSecurity::uncelled(0), 1000, "alpha").unwrap();

        let worker = {
            let orchestrator = orchestrator.clone();
            std::thread::spawn(move || {
                let cancel = CancelToken::new();
                let request = orchestrator.queue().recv(&cancel).unwrap();
                assert_eq!(request.fingerprint.action, "trustedcell.change_cell");
                orchestrator.queue().put_response(request.id, Decision::Deny, false).unwrap();
            })
        };

        let result = adapter.assign_cell(&cred, 1000, "beta");
        worker.join().unwrap();
        assert!(matches!(result, Err(Error::Denied)));
    }

    #[test]
    fn allowed_transition_installs_new_cell() {
        let (orchestrator, adapter) = adapter();
        let cred = adapter.assign_cell(&CredSecurity::uncelled(0), 1000, "alpha").unwrap();

        let worker = {
            let orchestrator = orchestrator.clone();
            std::thread::spawn(move || {
                let cancel = CancelToken::new();
                let request = orchestrator.queue().recv(&cancel).unwrap();
                orchestrator.queue().put_response(request.id, Decision::Allow, false).unwrap();
            })
        };

        let cred = adapter.assign_cell(&cred, 1000, "beta").unwrap();
        worker.join().unwrap();
        assert_eq!(cred.cell.unwrap().as_str(), "beta");
        // initial_uid survives the transition unchanged.
        assert_eq!(cred.initial_uid, 1000);
    }

    #[test]
    fn access_allowed_matrix() {
        let uncelled_a = CredSecurity::uncelled(1);
        let uncelled_b = CredSecurity::uncelled(2);
        assert!(CredentialAdapter::access_allowed(&uncelled_a, &uncelled_b));

        let celled_alpha = CredSecurity { initial_uid: 1, cell: Some(CellId::new("alpha").unwrap()) };
        let celled_alpha2 = CredSecurity { initial_uid: 2, cell: Some(CellId::new("alpha").unwrap()) };
        let celled_beta = CredSecurity { initial_uid: 1, cell: Some(CellId::new("beta").unwrap()) };

        assert!(CredentialAdapter::access_allowed(&celled_alpha, &celled_alpha2));
        assert!(!CredentialAdapter::access_allowed(&celled_alpha, &celled_beta));
        assert!(!CredentialAdapter::access_allowed(&celled_alpha, &uncelled_a));
        assert!(!CredentialAdapter::access_allowed(&uncelled_a, &celled_alpha));
    }
}
