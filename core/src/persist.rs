use crate::index::Segment;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn segment(&self) -> PathBuf { self.root.join("segment.bin") }
    fn segment_tmp(&self) -> PathBuf { self.root.join("segment.bin.tmp") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn save_segment(paths: &IndexPaths, segment: &Segment) -> Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(segment)?;
    // Write then rename so a crash never leaves a truncated segment behind.
    let mut f = File::create(paths.segment_tmp())?;
    f.write_all(&bytes)?;
    f.sync_all()?;
    fs::rename(paths.segment_tmp(), paths.segment())?;
    Ok(())
}

pub fn load_segment(paths: &IndexPaths) -> Result<Segment> {
    let mut f = File::open(paths.segment())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let segment = bincode::deserialize(&buf)?;
    Ok(segment)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Persist a committed segment and its metadata.
pub fn save_snapshot(paths: &IndexPaths, segment: &Segment) -> Result<MetaFile> {
    save_segment(paths, segment).with_context(|| format!("writing segment under {}", paths.root.display()))?;
    let meta = MetaFile {
        num_docs: segment.num_docs(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    Ok(meta)
}

/// Load the snapshot under `paths`. `None` when no snapshot has been written yet.
pub fn load_snapshot(paths: &IndexPaths) -> Result<Option<Segment>> {
    if !paths.meta().exists() {
        return Ok(None);
    }
    let meta = load_meta(paths).context("reading meta.json")?;
    if meta.version != FORMAT_VERSION {
        bail!("unsupported snapshot version {} (expected {FORMAT_VERSION})", meta.version);
    }
    let segment = load_segment(paths).context("reading segment.bin")?;
    if segment.num_docs() != meta.num_docs {
        bail!("snapshot holds {} documents, meta.json says {}", segment.num_docs(), meta.num_docs);
    }
    Ok(Some(segment))
}
