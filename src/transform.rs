//! Document-wide transforms applied right before writing.

use crate::data_structures::document::{Document, Handle};

/// Merge all buffers into the first one.
///
/// A GLB container carries exactly one binary chunk, so every accessor has
/// to live in the same buffer before the document can be written. Running
/// this on a document with zero or one buffer is a no-op.
pub fn unpartition(document: &mut Document) {
    if document.buffers.len() <= 1 {
        return;
    }
    let merged = Handle::new(0);
    for accessor in document.accessors.iter_mut() {
        accessor.buffer = merged;
    }
    let removed = document.buffers.len() - 1;
    document.buffers.truncate(1);
    log::debug!(
        "unpartitioned {} buffers into {:?}",
        removed + 1,
        document.buffers[0].name
    );
}
