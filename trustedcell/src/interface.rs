// SPDX-License-Identifier: GPL-2.0-only
//! The pseudo-filesystem contract surface: the line-oriented wire format
//! exchanged over the host channel, plus the well-known object tags and
//! action names hooked operations use to call [`crate::orchestrator`].
//!
//! A `securityfs`-style layer exposes this as a set of files (`queue`,
//! `status`, `me`); this crate only owns the text encoding and constant
//! vocabulary, not the filesystem plumbing a host binary would wrap around
//! it.

use trustedcell_common::{Error, Result};

use crate::cache::Decision;

/// Lower bound a host implementation should size its `read(2)` buffer to
/// when draining the `queue` file, so a single read is never split across a
/// request line. Five `u32`-ish decimal fields plus three category/owner/
/// action fields at their maximum lengths, plus separators and the newline,
/// comfortably fit in this.
pub const HOST_READ_BUFFER_MIN: usize = 512;

/// Category tag for process-to-process relationships (`ptrace`, signal
/// delivery): never owner-qualified, since the owner field has no meaning
/// between two processes.
pub const CATEGORY_PROC: &str = "~proc";
/// Category tag for cell-assignment requests: owner-qualified, since the
/// owner field carries the proposed new cell text.
pub const CATEGORY_TRUSTEDCELL: &str = "~trustedcell";

/// Placeholder owner value for object categories that don't supply one.
pub const OWNER_UNSET: &str = "?";

pub const ACTION_CHANGE_CELL: &str = "trustedcell.change_cell";
pub const ACTION_OPEN_RO: &str = "posix.open_ro";
pub const ACTION_OPEN_WO: &str = "posix.open_wo";
pub const ACTION_OPEN_RW: &str = "posix.open_rw";
pub const ACTION_OPEN: &str = "posix.open";
pub const ACTION_READ_DIR: &str = "posix.read_dir";
pub const ACTION_CREATE_REG: &str = "posix.create_reg";
pub const ACTION_UNLINK: &str = "posix.unlink";
pub const ACTION_MKDIR: &str = "posix.mkdir";
pub const ACTION_RMDIR: &str = "posix.rmdir";
pub const ACTION_MKNOD: &str = "posix.mknod";

/// Extended-attribute names an object's category and owner are read from.
pub const XATTR_CATEGORY: &str = "security.tc_category";
pub const XATTR_OWNER: &str = "security.tc_owner";

/// Formats one outbound request line: `<id> <uid> <cell> <category> <owner>
/// <action>\n`. `cell` is written as `-` for an uncelled subject, since the
/// field must never be empty or contain whitespace.
pub fn format_request_line(id: u64, uid: u32, cell: Option<&str>, category: &str, owner: &str, action: &str) -> String {
    format!("{id} {uid} {} {category} {owner} {action}\n", cell.unwrap_or("-"))
}

/// Parses one host response line: `<id> <permit:int> <cacheable:int>`.
/// `permit`/`cacheable` are parsed as integers and interpreted as
/// `!= 0` (so e.g. `2` means true, same as `1`) — `0`/`1` is the
/// conventional notation, not a narrowing of what the field accepts.
/// Trailing whitespace (including a line terminator) is ignored; a
/// non-integer field is `Error::Invalid`.
pub fn parse_response_line(line: &str) -> Result<(u64, Decision, bool)> {
    let mut fields = line.trim_end().split_ascii_whitespace();

    let id = fields
        .next()
        .ok_or(Error::Invalid("missing request id"))?
        .parse::<u64>()
        .map_err(|_| Error::Invalid("malformed request id"))?;

    let permit = parse_flag(fields.next().ok_or(Error::Invalid("missing permit field"))?)?;
    let cacheable = parse_flag(fields.next().ok_or(Error::Invalid("missing cacheable field"))?)?;

    if fields.next().is_some() {
        return Err(Error::Invalid("trailing fields in response line"));
    }

    Ok((id, Decision::from_permit(permit), cacheable))
}

fn parse_flag(field: &str) -> Result<bool> {
    field
        .parse::<i64>()
        .map(|value| value != 0)
        .map_err(|_| Error::Invalid("expected an integer flag"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_round_trips_fields() {
        let line = format_request_line(42, 1000, Some("alpha"), "~proc", "?", ACTION_OPEN_RO);
        assert_eq!(line, "42 1000 alpha ~proc ? posix.open_ro\n");
    }

    #[test]
    fn request_line_marks_uncelled_subject() {
        let line = format_request_line(1, 0, None, CATEGORY_PROC, OWNER_UNSET, ACTION_READ_DIR);
        assert_eq!(line, "1 0 - ~proc ? posix.read_dir\n");
    }

    #[test]
    fn response_line_parses_allow_cacheable() {
        let (id, decision, cacheable) = parse_response_line("42 1 1\n").unwrap();
        assert_eq!(id, 42);
        assert_eq!(decision, Decision::Allow);
        assert!(cacheable);
    }

    #[test]
    fn response_line_parses_deny_not_cacheable() {
        let (id, decision, cacheable) = parse_response_line("7 0 0").unwrap();
        assert_eq!(id, 7);
        assert_eq!(decision, Decision::Deny);
        assert!(!cacheable);
    }

    #[test]
    fn response_line_rejects_malformed_fields() {
        assert!(matches!(parse_response_line("notanumber 1 1"), Err(Error::Invalid(_))));
        assert!(matches!(parse_response_line("1 1"), Err(Error::Invalid(_))));
        assert!(matches!(parse_response_line("1 1 1 extra"), Err(Error::Invalid(_))));
    }

    #[test]
    fn response_line_treats_nonzero_permit_as_allow() {
        let (id, decision, cacheable) = parse_response_line("1 2 1").unwrap();
        assert_eq!(id, 1);
        assert_eq!(decision, Decision::Allow);
        assert!(cacheable);
    }
}
