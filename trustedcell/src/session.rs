// SPDX-License-Identifier: GPL-2.0-only
//! The host session: an exclusive lease of the queue to one external
//! process at a time, identified by its process-group id.

use parking_lot::Mutex;
use trustedcell_common::{Error, Result};

pub struct HostSession {
    current: Mutex<Option<u32>>,
}

impl Default for HostSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSession {
    pub fn new() -> Self {
        Self { current: Mutex::new(None) }
    }

    pub fn is_attached(&self) -> bool {
        self.current.lock().is_some()
    }

    /// One byte for the `status` pseudo-file: `'1'` if a host is attached,
    /// `'0'` otherwise.
    pub fn status_byte(&self) -> u8 {
        if self.is_attached() {
            b'1'
        } else {
            b'0'
        }
    }

    /// Opens the host channel for `caller_pgid`. Rejects callers already
    /// assigned to a cell (a celled process can never become the host).
    /// Succeeds immediately if no host is attached, or if the attached host
    /// is this same process group (re-entrant open); fails with
    /// [`Error::Busy`] if a different process group already holds the lease.
    pub fn attach(&self, caller_has_cell: bool, caller_pgid: u32) -> Result<()> {
        if caller_has_cell {
            return Err(Error::Denied);
        }
        let mut guard = self.current.lock();
        match *guard {
            None => {
                *guard = Some(caller_pgid);
                tracing::info!(pgid = caller_pgid, "host channel attached");
                Ok(())
            }
            Some(pgid) if pgid == caller_pgid => Ok(()),
            Some(_) => {
                tracing::warn!(pgid = caller_pgid, "host channel busy");
                Err(Error::Busy)
            }
        }
    }

    /// Closes the host channel: an unconditional clear, since only the
    /// process holding the file descriptor can trigger this release in the
    /// first place.
    pub fn detach(&self) {
        let mut guard = self.current.lock();
        if let Some(pgid) = guard.take() {
            tracing::info!(pgid, "host channel detached");
        }
    }
}
