//! # String Buffer
//!
//! Append-only text accumulated directly in arena memory.
//!
//! Every append first commits room ahead of `used`, writes in place, then
//! claims exactly the bytes written. Formatted appends reserve at least one
//! kilobyte per call so short `write!` fragments do not commit one at a time.

use crate::memory::Arena;
use std::fmt;

/// Space committed ahead of a formatted append.
pub const FORMAT_RESERVE: usize = 1024;

/// A growable text buffer over a private [`Arena`].
///
/// # Example
///
/// ```rust,ignore
/// let mut buff = StrBuff::new();
/// write!(buff, "{}_{}", 3, "some_text")?;
/// buff.newline();
/// assert_eq!(buff.as_str(), "3_some_text\n");
/// ```
#[derive(Debug, Default)]
pub struct StrBuff {
    arena: Arena,
}

impl StrBuff {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    /// Appends `text`, returning the number of bytes written.
    pub fn append(&mut self, text: &str) -> usize {
        let bytes = text.as_bytes();
        self.arena.ensure_space(bytes.len());
        self.arena.spare_mut()[..bytes.len()].copy_from_slice(bytes);
        self.arena.claim(bytes.len());
        bytes.len()
    }

    /// Appends formatted text, returning the number of bytes written.
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> usize {
        self.arena.ensure_space(FORMAT_RESERVE);
        let before = self.len();
        // Writing to a StrBuff cannot fail.
        let _ = fmt::Write::write_fmt(self, args);
        self.len() - before
    }

    /// Appends a line break.
    pub fn newline(&mut self) -> usize {
        self.append("\n")
    }

    /// Returns the accumulated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.arena.used_bytes()).unwrap_or_default()
    }

    /// Returns the length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.arena.used()
    }

    /// Returns true if nothing has been appended.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.arena.used() == 0
    }

    /// Discards the text, keeping the committed memory.
    pub fn clear(&mut self) {
        self.arena.clear();
    }

    /// Returns the backing arena.
    #[inline]
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }
}

impl fmt::Write for StrBuff {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}

impl fmt::Display for StrBuff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_append_and_read() {
        let mut buff = StrBuff::new();
        assert!(buff.is_empty());
        assert_eq!(buff.append("an string appended"), 18);
        buff.newline();
        assert_eq!(buff.as_str(), "an string appended\n");
        assert_eq!(buff.len(), 19);
    }

    #[test]
    fn test_formatted_append() {
        let mut buff = StrBuff::new();
        let mut total = 0;
        for i in 0..20u32 {
            total += buff.print(format_args!("{}_{}_{} ->\n", i, i * 2, "some_text"));
        }
        assert_eq!(total, buff.len());
        assert!(buff.as_str().starts_with("0_0_some_text ->\n1_2_some_text ->\n"));
        assert!(buff.arena().committed() >= buff.len());
    }

    #[test]
    fn test_write_macro() {
        let mut buff = StrBuff::new();
        write!(buff, "{}-{}", "a", 1).unwrap();
        assert_eq!(buff.to_string(), "a-1");
    }

    #[test]
    fn test_grows_past_first_chunk() {
        let mut buff = StrBuff::new();
        let line = "x".repeat(1000);
        for _ in 0..40 {
            buff.append(&line);
        }
        assert_eq!(buff.len(), 40_000);
        assert!(buff.as_str().bytes().all(|b| b == b'x'));
    }

    #[test]
    fn test_clear_keeps_commit() {
        let mut buff = StrBuff::new();
        buff.append("hello");
        let committed = buff.arena().committed();
        buff.clear();
        assert!(buff.is_empty());
        assert_eq!(buff.arena().committed(), committed);
        buff.append("again");
        assert_eq!(buff.as_str(), "again");
    }
}
