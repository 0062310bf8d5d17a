use anyhow::{Context, Result};
use cinedex_core::persist::IndexPaths;
use cinedex_core::record::parse_records;
use cinedex_core::schema::{OVERVIEW, TITLE};
use cinedex_core::{Engine, FieldBoosts, Schema};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cinedex-indexer")]
#[command(about = "Build and query movie index snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from JSON/JSONL files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output snapshot directory
        #[arg(long)]
        output: String,
        /// Add to an existing snapshot instead of starting empty
        #[arg(long, default_value_t = false)]
        append: bool,
        /// Log and skip files that fail to parse or contain malformed records
        #[arg(long, default_value_t = false)]
        skip_invalid: bool,
    },
    /// Run a query against a snapshot and print hits as JSON lines
    Query {
        /// Snapshot directory
        #[arg(long)]
        index: String,
        /// Query string
        #[arg(long)]
        q: String,
        /// Number of results
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[arg(long, default_value_t = 2.0)]
        title_boost: f32,
        #[arg(long, default_value_t = 1.0)]
        overview_boost: f32,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, append, skip_invalid } => {
            build_index(Path::new(&input), Path::new(&output), append, skip_invalid).map(|_| ())
        }
        Commands::Query { index, q, k, title_boost, overview_boost } => {
            let boosts = FieldBoosts::new([(TITLE, title_boost), (OVERVIEW, overview_boost)])?;
            let engine = Engine::load(&IndexPaths::new(&index), Schema::movies(), boosts)?;
            let mut out = std::io::stdout().lock();
            for hit in engine.query(&q, k)? {
                writeln!(out, "{}", serde_json::to_string(&hit)?)?;
            }
            Ok(())
        }
    }
}

/// Index every input file as its own batch and write the snapshot. Returns the document count.
fn build_index(input: &Path, output: &Path, append: bool, skip_invalid: bool) -> Result<u32> {
    let out_paths = IndexPaths::new(output);
    let engine = if append {
        Engine::load(&out_paths, Schema::movies(), FieldBoosts::movies())?
    } else {
        Engine::default()
    };

    let files = input_files(input);
    if files.is_empty() {
        anyhow::bail!("no .json or .jsonl files under {}", input.display());
    }

    for file in files {
        match index_file(&engine, &file) {
            Ok(inserted) => tracing::info!(file = %file.display(), inserted, "indexed file"),
            Err(err) if skip_invalid => tracing::warn!(file = %file.display(), error = %err, "skipped file"),
            Err(err) => return Err(err),
        }
    }

    let meta = engine.save(&out_paths)?;
    tracing::info!(output = %output.display(), num_docs = meta.num_docs, "index build complete");
    Ok(meta.num_docs)
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn index_file(engine: &Engine, file: &Path) -> Result<usize> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let records = parse_records(&bytes).with_context(|| format!("parsing {}", file.display()))?;
    let report = engine.ingest(&records).with_context(|| format!("indexing {}", file.display()))?;
    Ok(report.inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOVIES: &str = r#"{"results":[
        {"title":"The Matrix","overview":"A hacker discovers reality is a simulation"},
        {"title":"Simulation Theory","overview":"A documentary about reality"}
    ]}"#;

    #[test]
    fn builds_snapshot_from_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.json"), MOVIES).unwrap();
        fs::write(input.path().join("b.jsonl"), "{\"title\":\"Heat\",\"overview\":\"heist\"}\n").unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let n = build_index(input.path(), output.path(), false, false).unwrap();
        assert_eq!(n, 3);

        let engine = Engine::load(&IndexPaths::new(output.path()), Schema::movies(), FieldBoosts::movies()).unwrap();
        let hits = engine.query("heist", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Heat");
    }

    #[test]
    fn malformed_file_aborts_unless_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.json"), MOVIES).unwrap();
        fs::write(input.path().join("b.json"), r#"[{"title":"No overview"}]"#).unwrap();

        assert!(build_index(input.path(), output.path(), false, false).is_err());
        assert_eq!(build_index(input.path(), output.path(), false, true).unwrap(), 2);
    }

    #[test]
    fn append_extends_existing_snapshot() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let file = input.path().join("a.json");
        fs::write(&file, MOVIES).unwrap();

        assert_eq!(build_index(&file, output.path(), false, false).unwrap(), 2);
        assert_eq!(build_index(&file, output.path(), true, false).unwrap(), 4);
        assert_eq!(build_index(&file, output.path(), false, false).unwrap(), 2);
    }
}
