use crate::error::Result;
use crate::index::{DocId, FieldMap, InvertedIndex, Segment};
use parking_lot::MutexGuard;

/// Exclusive batch writer. Changes go to a private copy of the latest segment and
/// become visible to readers only on [`IndexWriter::commit`]; dropping the writer
/// without committing discards them.
pub struct IndexWriter<'a> {
    index: &'a InvertedIndex,
    _guard: MutexGuard<'a, ()>,
    working: Segment,
    pending: usize,
}

impl<'a> IndexWriter<'a> {
    pub(crate) fn new(index: &'a InvertedIndex, guard: MutexGuard<'a, ()>, working: Segment) -> Self {
        Self { index, _guard: guard, working, pending: 0 }
    }

    pub fn add_document(&mut self, fields: &FieldMap) -> Result<DocId> {
        self.working.check_document(self.pending, fields)?;
        self.pending += 1;
        Ok(self.working.add_document(fields))
    }

    /// Validate the whole batch first, then add every document. Either all of the
    /// batch is staged or none of it.
    pub fn index_batch(&mut self, documents: &[FieldMap]) -> Result<usize> {
        for (i, doc) in documents.iter().enumerate() {
            self.working.check_document(i, doc)?;
        }
        for doc in documents {
            self.working.add_document(doc);
        }
        self.pending += documents.len();
        Ok(documents.len())
    }

    /// Documents staged since the writer was opened.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Publish the working segment and release the writer lock.
    pub fn commit(self) -> u32 {
        let num_docs = self.working.num_docs();
        if self.pending > 0 {
            self.index.publish(self.working);
        }
        num_docs
    }
}

/// Index a batch as one commit. Fails with `MalformedDocument` and leaves the
/// index untouched if any document lacks a required field.
pub fn index_batch(index: &InvertedIndex, documents: &[FieldMap]) -> Result<usize> {
    let mut writer = index.writer();
    let inserted = match writer.index_batch(documents) {
        Ok(n) => n,
        Err(err) => {
            tracing::warn!(error = %err, batch = documents.len(), "rejected batch");
            return Err(err);
        }
    };
    let num_docs = writer.commit();
    tracing::info!(inserted, num_docs, "committed batch");
    Ok(inserted)
}
