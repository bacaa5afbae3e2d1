// SPDX-License-Identifier: GPL-2.0-only
//! The fingerprint tuple: `(uid, cell, category, owner, action)`, used both
//! as a cache key and as the request payload.
//!
//! `~`-prefixed categories are "owner-qualified": `owner` participates in
//! equality. For every other category, `owner` is carried along (the host
//! still needs it to answer the question) but ignored for matching.

use std::hash::{BuildHasher, Hash, Hasher};

use trustedcell_common::{CellId, Error, Result};

pub const CATEGORY_MAX_LEN: usize = 47;
pub const OWNER_MAX_LEN: usize = 127;
pub const ACTION_MAX_LEN: usize = 31;

pub fn validate_category(category: &str) -> Result<()> {
    if category.len() > CATEGORY_MAX_LEN {
        return Err(Error::Invalid("category exceeds maximum length"));
    }
    Ok(())
}

pub fn validate_owner(owner: &str) -> Result<()> {
    if owner.len() > OWNER_MAX_LEN {
        return Err(Error::Invalid("owner exceeds maximum length"));
    }
    Ok(())
}

pub fn validate_action(action: &str) -> Result<()> {
    if action.len() > ACTION_MAX_LEN {
        return Err(Error::Invalid("action exceeds maximum length"));
    }
    Ok(())
}

fn is_owner_qualified(category: &str) -> bool {
    category.starts_with('~')
}

/// An owned fingerprint, as stored in a [`crate::cache::DecisionCache`] entry
/// or carried by a [`crate::queue::Request`].
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub uid: u32,
    pub cell: CellId,
    pub category: String,
    pub owner: String,
    pub action: String,
}

impl Fingerprint {
    pub fn new(uid: u32, cell: CellId, category: &str, owner: &str, action: &str) -> Result<Self> {
        validate_category(category)?;
        validate_owner(owner)?;
        validate_action(action)?;
        Ok(Self {
            uid,
            cell,
            category: category.to_owned(),
            owner: owner.to_owned(),
            action: action.to_owned(),
        })
    }

    pub fn owner_qualified(&self) -> bool {
        is_owner_qualified(&self.category)
    }

    /// Matches against a borrowed view of the same five fields without
    /// allocating — this is the comparison both `lookup` and `add` use, so
    /// the owner-qualification rule lives in exactly one place.
    pub fn matches(&self, uid: u32, cell: &CellId, category: &str, owner: &str, action: &str) -> bool {
        self.uid == uid
            && self.cell == *cell
            && self.category == category
            && self.action == action
            && (!is_owner_qualified(category) || self.owner == owner)
    }
}

/// Computes the shard-selecting hash for a fingerprint's fields.
///
/// Hashes the real tuple (owner included only when the category is
/// owner-qualified, so two fingerprints that compare equal always land in
/// the same shard) rather than degenerating every shard into a single
/// bucket.
pub fn shard_hash(hasher: &ahash::RandomState, uid: u32, cell: &CellId, category: &str, owner: &str, action: &str) -> u64 {
    let mut h = hasher.build_hasher();
    uid.hash(&mut h);
    cell.as_str().hash(&mut h);
    category.hash(&mut h);
    if is_owner_qualified(category) {
        owner.hash(&mut h);
    }
    action.hash(&mut h);
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> CellId {
        CellId::new(text).unwrap()
    }

    #[test]
    fn owner_qualified_category_compares_owner() {
        let fp = Fingerprint::new(1000, cell("alpha"), "~proc", "alpha", "posix.open_ro").unwrap();
        assert!(fp.matches(1000, &cell("alpha"), "~proc", "alpha", "posix.open_ro"));
        assert!(!fp.matches(1000, &cell("alpha"), "~proc", "beta", "posix.open_ro"));
    }

    #[test]
    fn unqualified_category_ignores_owner() {
        let fp = Fingerprint::new(1000, cell("alpha"), "docs", "alpha", "posix.open_ro").unwrap();
        assert!(fp.matches(1000, &cell("alpha"), "docs", "beta", "posix.open_ro"));
    }

    #[test]
    fn rejects_oversized_fields() {
        let long_category: String = "~".to_string() + &"x".repeat(CATEGORY_MAX_LEN);
        assert!(validate_category(&long_category).is_err());

        let long_action = "a".repeat(ACTION_MAX_LEN + 1);
        assert!(validate_action(&long_action).is_err());

        let long_owner = "o".repeat(OWNER_MAX_LEN + 1);
        assert!(validate_owner(&long_owner).is_err());
    }

    #[test]
    fn equal_fingerprints_share_a_shard() {
        let hasher = ahash::RandomState::new();
        let h1 = shard_hash(&hasher, 1000, &cell("alpha"), "docs", "alpha", "posix.open_ro");
        let h2 = shard_hash(&hasher, 1000, &cell("alpha"), "docs", "beta", "posix.open_ro");
        assert_eq!(h1, h2, "owner is ignored for unqualified categories");

        let h3 = shard_hash(&hasher, 1000, &cell("alpha"), "~proc", "alpha", "posix.open_ro");
        let h4 = shard_hash(&hasher, 1000, &cell("alpha"), "~proc", "beta", "posix.open_ro");
        assert_ne!(h3, h4, "owner participates for qualified categories");
    }
}
