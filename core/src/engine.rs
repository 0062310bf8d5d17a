use crate::error::Result;
use crate::index::{DocId, FieldMap, FieldStats, InvertedIndex, Segment, StoredDocument};
use crate::persist::{load_snapshot, save_snapshot, IndexPaths, MetaFile};
use crate::query::parse;
use crate::schema::{FieldBoosts, Schema, OVERVIEW, TITLE};
use crate::search::search;
use crate::writer::index_batch;
use anyhow::anyhow;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieHit {
    pub doc_id: DocId,
    pub score: f32,
    pub title: String,
    pub overview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub num_docs: u32,
    pub fields: Vec<(String, FieldStats)>,
}

/// Index handle plus the default field boosts used for queries.
pub struct Engine {
    index: InvertedIndex,
    boosts: FieldBoosts,
}

impl Engine {
    pub fn new(schema: Schema, boosts: FieldBoosts) -> Self {
        Self { index: InvertedIndex::new(schema), boosts }
    }

    pub fn from_segment(segment: Segment, boosts: FieldBoosts) -> Self {
        Self { index: InvertedIndex::from_segment(segment), boosts }
    }

    /// Start from the snapshot under `paths`, or empty if there is none. A
    /// snapshot written with different fields than `schema` is rejected.
    pub fn load(paths: &IndexPaths, schema: Schema, boosts: FieldBoosts) -> Result<Self> {
        match load_snapshot(paths)? {
            Some(segment) if segment.schema() != &schema => Err(anyhow!(
                "snapshot under {} has fields {:?}, expected {:?}",
                paths.root.display(),
                segment.schema().fields(),
                schema.fields()
            )
            .into()),
            Some(segment) => {
                tracing::info!(root = %paths.root.display(), num_docs = segment.num_docs(), "loaded snapshot");
                Ok(Self::from_segment(segment, boosts))
            }
            None => Ok(Self::new(schema, boosts)),
        }
    }

    pub fn save(&self, paths: &IndexPaths) -> Result<MetaFile> {
        let meta = save_snapshot(paths, &self.index.snapshot())?;
        tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "saved snapshot");
        Ok(meta)
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn boosts(&self) -> &FieldBoosts {
        &self.boosts
    }

    pub fn snapshot(&self) -> Arc<Segment> {
        self.index.snapshot()
    }

    /// Index every record in one commit, or none of them.
    pub fn ingest(&self, records: &[FieldMap]) -> Result<IngestReport> {
        let inserted = index_batch(&self.index, records)?;
        Ok(IngestReport { inserted })
    }

    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<MovieHit>> {
        self.query_with_boosts(text, top_k, &self.boosts)
    }

    pub fn query_with_boosts(&self, text: &str, top_k: usize, boosts: &FieldBoosts) -> Result<Vec<MovieHit>> {
        let parsed = parse(text, boosts)?;
        let segment = self.index.snapshot();
        search(&segment, &parsed, top_k)
            .into_iter()
            .map(|hit| -> Result<MovieHit> {
                let doc = segment.stored_fields(hit.doc_id)?;
                Ok(MovieHit {
                    doc_id: hit.doc_id,
                    score: hit.score,
                    title: doc.get(TITLE).unwrap_or_default().to_string(),
                    overview: doc.get(OVERVIEW).unwrap_or_default().to_string(),
                })
            })
            .collect()
    }

    pub fn document(&self, doc_id: DocId) -> Result<Arc<StoredDocument>> {
        self.index.stored_fields(doc_id)
    }

    pub fn stats(&self) -> IndexStats {
        let segment = self.index.snapshot();
        let fields = segment
            .schema()
            .fields()
            .iter()
            .filter_map(|name| Some((name.clone(), segment.field_stats(name)?)))
            .collect();
        IndexStats { num_docs: segment.num_docs(), fields }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Schema::movies(), FieldBoosts::movies())
    }
}
