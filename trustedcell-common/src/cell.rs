// SPDX-License-Identifier: GPL-2.0-only
//! Reference-counted, immutable cell identifiers.
//!
//! A [`CellId`] is shared among every credential, pending request and cache
//! entry that names it. `Arc<str>` gives the lifecycle this needs directly:
//! `clone` bumps the refcount, the last `Drop` frees the text buffer and the
//! container in one step. No weak references are ever taken; a consumer
//! either owns a strong reference or does not hold the identity at all.

use std::{fmt, sync::Arc};

use crate::error::{Error, Result};

/// Maximum length, in bytes, of a cell identifier.
pub const CELL_ID_MAX_LEN: usize = 127;

/// A named principal identity attached to a process credential.
///
/// Equality and hashing are by text. Cloning is cheap (an atomic increment);
/// there is no deep copy.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct CellId(Arc<str>);

impl CellId {
    /// Validates and interns a cell identifier.
    ///
    /// Accepts 1..=127 bytes, every byte a graphic (printable, non-space)
    /// character, matching the length cap enforced at the `me` write site.
    pub fn new(text: impl Into<Arc<str>>) -> Result<Self> {
        let text = text.into();
        if text.is_empty() || text.len() > CELL_ID_MAX_LEN {
            return Err(Error::Invalid("cell identifier length out of range"));
        }
        if !text.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::Invalid("cell identifier must be all graphic characters"));
        }
        Ok(Self(text))
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number of strong references currently outstanding.
    ///
    /// Exposed for tests asserting the "refcount 0 implies unobservable"
    /// invariant; not meant to drive production logic.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({:?})", self.0)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CellId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for CellId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
