use crate::error::{Error, Result};
use crate::schema::{FieldId, Schema};
use crate::tokenizer::tokenize;
use crate::writer::IndexWriter;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub type DocId = u32;

/// Raw input document: field name -> text.
pub type FieldMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,
    /// Token positions of the term within the field, ascending.
    pub positions: Vec<u32>,
}

/// Postings for one (field, term), sorted by doc_id, one entry per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingsList {
    postings: Vec<Posting>,
}

impl PostingsList {
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Number of distinct documents containing the term in this field.
    pub fn doc_frequency(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    pub fn as_slice(&self) -> &[Posting] {
        &self.postings
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|i| &self.postings[i])
    }

    /// Index of the first posting at or after `from` whose doc_id is >= `target`.
    pub fn seek(&self, from: usize, target: DocId) -> usize {
        let from = from.min(self.postings.len());
        from + self.postings[from..].partition_point(|p| p.doc_id < target)
    }

    /// Record one occurrence. Doc ids arrive in non-decreasing order.
    fn record(&mut self, doc_id: DocId, position: u32) {
        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.term_freq += 1;
                last.positions.push(position);
            }
            last => {
                debug_assert!(last.map_or(true, |p| p.doc_id < doc_id), "doc ids must increase");
                self.postings.push(Posting { doc_id, term_freq: 1, positions: vec![position] });
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FieldIndex {
    postings: HashMap<String, Arc<PostingsList>>,
    /// Documents with at least one term in this field.
    doc_count: u32,
    total_terms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub doc_count: u32,
    pub total_terms: u64,
    pub unique_terms: usize,
    /// Mean number of terms over documents where the field is non-empty.
    pub avg_field_len: f32,
}

/// Stored values of one document, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub doc_id: DocId,
    pub fields: Vec<(String, String)>,
}

impl StoredDocument {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, v)| v.as_str())
    }

    pub fn to_map(&self) -> FieldMap {
        self.fields.iter().cloned().collect()
    }
}

/// Immutable point-in-time view of the index. Published segments are never mutated;
/// writers work on a clone that shares untouched postings lists and documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    schema: Schema,
    fields: Vec<FieldIndex>,
    docs: Vec<Arc<StoredDocument>>,
}

impl Segment {
    pub fn new(schema: Schema) -> Self {
        let fields = vec![FieldIndex::default(); schema.len()];
        Self { schema, fields, docs: Vec::new() }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_docs(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Ids are dense from zero and never reused.
    pub fn next_doc_id(&self) -> DocId {
        self.docs.len() as DocId
    }

    /// Postings for (field, term); empty when either is unknown.
    pub fn postings(&self, field: &str, term: &str) -> Arc<PostingsList> {
        self.schema
            .field_id(field)
            .and_then(|id| self.fields[id].postings.get(term).cloned())
            .unwrap_or_default()
    }

    pub(crate) fn field_postings(&self, field: FieldId, term: &str) -> Option<&PostingsList> {
        self.fields.get(field)?.postings.get(term).map(Arc::as_ref)
    }

    pub fn stored_fields(&self, doc_id: DocId) -> Result<&Arc<StoredDocument>> {
        self.docs.get(doc_id as usize).ok_or(Error::NotFound(doc_id))
    }

    pub fn field_stats(&self, field: &str) -> Option<FieldStats> {
        let f = &self.fields[self.schema.field_id(field)?];
        let avg_field_len = if f.doc_count == 0 { 0.0 } else { f.total_terms as f32 / f.doc_count as f32 };
        Some(FieldStats {
            doc_count: f.doc_count,
            total_terms: f.total_terms,
            unique_terms: f.postings.len(),
            avg_field_len,
        })
    }

    /// Reject documents lacking any schema field.
    pub(crate) fn check_document(&self, index: usize, fields: &FieldMap) -> Result<()> {
        match self.schema.fields().iter().find(|name| !fields.contains_key(*name)) {
            Some(missing) => Err(Error::MalformedDocument { index, field: missing.clone() }),
            None => Ok(()),
        }
    }

    /// Append a validated document. Only called on a writer's private working segment.
    pub(crate) fn add_document(&mut self, fields: &FieldMap) -> DocId {
        let doc_id = self.next_doc_id();
        let mut stored = Vec::with_capacity(self.schema.len());
        for (field_id, name) in self.schema.fields().iter().enumerate() {
            let text = fields.get(name).map(String::as_str).unwrap_or_default();
            let field = &mut self.fields[field_id];
            let mut seen = 0u64;
            for (term, pos) in tokenize(text) {
                let list = field.postings.entry(term).or_default();
                Arc::make_mut(list).record(doc_id, pos as u32);
                seen += 1;
            }
            if seen > 0 {
                field.doc_count += 1;
                field.total_terms += seen;
            }
            stored.push((name.clone(), text.to_string()));
        }
        self.docs.push(Arc::new(StoredDocument { doc_id, fields: stored }));
        doc_id
    }
}

/// Shared index handle: many concurrent readers, one writer at a time.
pub struct InvertedIndex {
    current: RwLock<Arc<Segment>>,
    writer_lock: Mutex<()>,
}

impl InvertedIndex {
    pub fn new(schema: Schema) -> Self {
        Self::from_segment(Segment::new(schema))
    }

    pub fn from_segment(segment: Segment) -> Self {
        Self { current: RwLock::new(Arc::new(segment)), writer_lock: Mutex::new(()) }
    }

    /// The latest committed segment. Holding it never blocks writers.
    pub fn snapshot(&self) -> Arc<Segment> {
        self.current.read().clone()
    }

    /// Wait for the writer lock and start a batch on top of the latest commit.
    ///
    /// The working copy clones each field's term map and the document list:
    /// O(vocabulary + documents) pointer copies per writer, while postings lists
    /// and stored documents stay shared until touched. Batch documents through
    /// one writer rather than calling [`InvertedIndex::add_document`] in a loop.
    pub fn writer(&self) -> IndexWriter<'_> {
        let guard = self.writer_lock.lock();
        let working = Segment::clone(&self.snapshot());
        IndexWriter::new(self, guard, working)
    }

    /// Add and commit a single document.
    pub fn add_document(&self, fields: &FieldMap) -> Result<DocId> {
        let mut writer = self.writer();
        let doc_id = writer.add_document(fields)?;
        writer.commit();
        Ok(doc_id)
    }

    pub fn stored_fields(&self, doc_id: DocId) -> Result<Arc<StoredDocument>> {
        self.snapshot().stored_fields(doc_id).cloned()
    }

    pub fn postings(&self, field: &str, term: &str) -> Arc<PostingsList> {
        self.snapshot().postings(field, term)
    }

    pub fn num_docs(&self) -> u32 {
        self.snapshot().num_docs()
    }

    pub(crate) fn publish(&self, segment: Segment) {
        *self.current.write() = Arc::new(segment);
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new(Schema::default())
    }
}
