//! A minimal in-memory text overlay over an original source buffer.
//!
//! The emitter needs to delete dead statements, rename bindings, and splice
//! in re-export glue without re-parsing or re-printing whole subtrees — it
//! records those edits as byte-range operations against the original text
//! and renders the patched result once, in one pass. This is the same shape
//! of problem `patch_vfs::format::Patch` solves for on-disk codemods, but
//! that type exists to serialize a patch as a unified diff (hence `diffy`,
//! `ouroboros`'s self-referencing borrow, and an MD5 header); bundler output
//! is built and rendered once in memory; there's nothing to serialize as a
//! diff and nothing to borrow across a self-reference, so none of that
//! machinery carries over here.

use std::fmt::{self, Display};
use std::ops::Range;

use anyhow::{anyhow, Result};

#[derive(Debug, Clone)]
enum Edit {
    Remove,
    Overwrite(String),
}

/// An original string plus a set of non-overlapping edits over it.
#[derive(Debug, Clone)]
pub struct MagicString {
    original: String,
    edits: Vec<(Range<usize>, Edit)>,
    prepended: Vec<String>,
    appended: Vec<String>,
}

impl MagicString {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            edits: Vec::new(),
            prepended: Vec::new(),
            appended: Vec::new(),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Deletes `range` from the rendered output.
    pub fn remove(&mut self, range: Range<usize>) -> Result<()> {
        self.insert_edit(range, Edit::Remove)
    }

    /// Replaces `range` with `text` in the rendered output.
    pub fn overwrite(&mut self, range: Range<usize>, text: impl Into<String>) -> Result<()> {
        self.insert_edit(range, Edit::Overwrite(text.into()))
    }

    /// Adds `text` immediately before the original buffer. Later calls land
    /// closer to the original content than earlier ones, so a sequence of
    /// `prepend` calls reads in call order in the final output.
    pub fn prepend(&mut self, text: impl Into<String>) {
        self.prepended.insert(0, text.into());
    }

    /// Adds `text` immediately after the original buffer, in call order.
    pub fn append(&mut self, text: impl Into<String>) {
        self.appended.push(text.into());
    }

    fn insert_edit(&mut self, range: Range<usize>, edit: Edit) -> Result<()> {
        if range.start > range.end || range.end > self.original.len() {
            return Err(anyhow!(
                "edit range {:?} is out of bounds for a {}-byte buffer",
                range,
                self.original.len()
            ));
        }
        if !self.original.is_char_boundary(range.start) || !self.original.is_char_boundary(range.end) {
            return Err(anyhow!(
                "edit range {:?} does not fall on a UTF-8 character boundary",
                range
            ));
        }
        if let Some((existing, _)) = self.edits.iter().find(|(r, _)| ranges_overlap(r, &range)) {
            return Err(anyhow!(
                "edit range {:?} overlaps an existing edit at {:?}",
                range,
                existing
            ));
        }
        let pos = self.edits.partition_point(|(r, _)| r.start < range.start);
        self.edits.insert(pos, (range, edit));
        Ok(())
    }

    /// Renders the final text: prepended chunks, then the original buffer
    /// with every edit applied left to right, then appended chunks.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.original.len());
        for chunk in &self.prepended {
            out.push_str(chunk);
        }
        let mut cursor = 0;
        for (range, edit) in &self.edits {
            out.push_str(&self.original[cursor..range.start]);
            if let Edit::Overwrite(text) = edit {
                out.push_str(text);
            }
            cursor = range.end;
        }
        out.push_str(&self.original[cursor..]);
        for chunk in &self.appended {
            out.push_str(chunk);
        }
        out
    }
}

impl Display for MagicString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

fn ranges_overlap(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod test;
