use cinedex_core::{Engine, Error, FieldBoosts, FieldMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn movie(title: &str, overview: &str) -> FieldMap {
    FieldMap::from([("title".to_string(), title.to_string()), ("overview".to_string(), overview.to_string())])
}

fn matrix_and_simulation() -> Engine {
    let engine = Engine::default();
    engine
        .ingest(&[
            movie("The Matrix", "A hacker discovers reality is a simulation"),
            movie("Simulation Theory", "A documentary about reality"),
        ])
        .unwrap();
    engine
}

#[test]
fn ingest_reports_batch_length_and_round_trips_fields() {
    let engine = Engine::default();
    let batch = vec![
        movie("Heat", "A group of professional bank robbers..."),
        movie("Léon: The Professional", "Mathilda, a 12-year-old girl"),
        movie("", ""),
    ];
    let report = engine.ingest(&batch).unwrap();
    assert_eq!(report.inserted, batch.len());
    for (i, input) in batch.iter().enumerate() {
        let stored = engine.document(i as u32).unwrap();
        assert_eq!(&stored.to_map(), input);
    }
}

#[test]
fn missing_field_rejects_batch_and_leaves_count_unchanged() {
    let engine = matrix_and_simulation();
    let mut no_overview = movie("Solaris", "");
    no_overview.remove("overview");
    let mut no_title = movie("", "ocean planet");
    no_title.remove("title");

    for bad in [no_overview, no_title] {
        let err = engine.ingest(&[movie("Stalker", "the zone"), bad]).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { index: 1, .. }));
        assert_eq!(engine.stats().num_docs, 2);
    }
    assert!(engine.query("stalker", 10).unwrap().is_empty());
    // Still usable afterwards.
    assert_eq!(engine.ingest(&[movie("Stalker", "the zone")]).unwrap().inserted, 1);
}

#[test]
fn every_term_of_a_lone_document_finds_it() {
    let title = "Eternal Sunshine of the Spotless Mind";
    let overview = "Joel is stunned to discover that his girlfriend Clementine had her memories of him erased.";
    for term in cinedex_core::tokenizer::terms(&format!("{title} {overview}")) {
        let engine = Engine::default();
        engine.ingest(&[movie(title, overview)]).unwrap();
        let hits = engine.query(&term, 1).unwrap();
        assert_eq!(hits.len(), 1, "term {term}");
        assert_eq!(hits[0].title, title);
        assert_eq!(hits[0].overview, overview);
    }
}

#[test]
fn title_match_outranks_overview_match() {
    let engine = Engine::default();
    engine.ingest(&[movie("Nothing here", "vertigo"), movie("vertigo", "Nothing here")]).unwrap();
    let hits = engine.query("vertigo", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].doc_id, 1);
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn per_request_boosts_can_flip_the_ranking() {
    let engine = Engine::default();
    engine.ingest(&[movie("Nothing here", "vertigo"), movie("vertigo", "Nothing here")]).unwrap();
    let boosts = FieldBoosts::new([("title", 1.0), ("overview", 5.0)]).unwrap();
    let hits = engine.query_with_boosts("vertigo", 10, &boosts).unwrap();
    assert_eq!(hits[0].doc_id, 0);
}

#[test]
fn empty_query_is_a_syntax_error() {
    let engine = matrix_and_simulation();
    assert!(matches!(engine.query("", 10), Err(Error::QuerySyntax { .. })));
    assert!(matches!(engine.query("  \t ", 10), Err(Error::QuerySyntax { .. })));
    assert!(matches!(engine.query("(reality", 10), Err(Error::QuerySyntax { .. })));
}

#[test]
fn repeated_queries_are_deterministic() {
    let engine = Engine::default();
    let batch: Vec<FieldMap> = (0..50)
        .map(|i| movie(&format!("Movie {i}"), &format!("a story about {} dragons", i % 7)))
        .collect();
    engine.ingest(&batch).unwrap();
    let first = engine.query("story OR dragons OR 3", 20).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.query("story OR dragons OR 3", 20).unwrap(), first);
    }
}

#[test]
fn matrix_scenario() {
    let engine = matrix_and_simulation();

    let reality = engine.query("reality", 10).unwrap();
    assert_eq!(reality.len(), 2);
    assert!(reality[0].score >= reality[1].score);
    let titles: Vec<&str> = reality.iter().map(|h| h.title.as_str()).collect();
    assert!(titles.contains(&"The Matrix"));
    assert!(titles.contains(&"Simulation Theory"));

    let matrix = engine.query("matrix", 10).unwrap();
    assert_eq!(matrix.len(), 1);
    assert_eq!(matrix[0].title, "The Matrix");
    assert_eq!(matrix[0].overview, "A hacker discovers reality is a simulation");

    // Title boost puts the title match first.
    let simulation = engine.query("simulation", 10).unwrap();
    assert_eq!(simulation[0].title, "Simulation Theory");
}

#[test]
fn empty_index_returns_empty_results() {
    let engine = Engine::default();
    assert!(engine.query("anything", 5).unwrap().is_empty());
    assert!(matches!(engine.document(0), Err(Error::NotFound(0))));
}

#[test]
fn readers_never_see_partial_batches() {
    const BATCH: usize = 25;
    const BATCHES: usize = 40;
    let engine = Arc::new(Engine::default());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let segment = engine.snapshot();
                    let n = segment.num_docs() as usize;
                    assert_eq!(n % BATCH, 0, "observed a partial batch");
                    assert_eq!(segment.postings("title", "common").len(), n);
                    assert_eq!(segment.postings("overview", "shared").len(), n);
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..2)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for b in 0..BATCHES / 2 {
                    let batch: Vec<FieldMap> = (0..BATCH)
                        .map(|i| movie(&format!("common w{w} b{b} {i}"), "shared overview"))
                        .collect();
                    assert_eq!(engine.ingest(&batch).unwrap().inserted, BATCH);
                }
            })
        })
        .collect();

    for w in writers {
        w.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(engine.stats().num_docs as usize, BATCH * BATCHES);
    let hits = engine.query("common", 1000).unwrap();
    let mut ids: Vec<u32> = hits.iter().map(|h| h.doc_id).collect();
    ids.sort();
    assert_eq!(ids, (0..(BATCH * BATCHES) as u32).collect::<Vec<_>>());
}

fn alternating(clauses: usize) -> String {
    let mut q = String::from("reality");
    for i in 1..clauses {
        q.push_str(if i % 2 == 0 { " AND reality" } else { " OR reality" });
    }
    q
}

#[test]
fn alternating_operators_are_bounded() {
    let engine = matrix_and_simulation();
    assert_eq!(engine.query(&alternating(500), 10).unwrap().len(), 2);
    assert!(matches!(engine.query(&alternating(10_000), 10), Err(Error::QuerySyntax { .. })));
    let negations = format!("{}reality", "NOT ".repeat(10_000));
    assert!(matches!(engine.query(&negations, 10), Err(Error::QuerySyntax { .. })));
}

#[test]
fn compatibility_digits_are_searchable() {
    let engine = Engine::default();
    engine.ingest(&[movie("Rocky ⑵", "Rocky fights again"), movie("½ Nelson", "")]).unwrap();
    let hits = engine.query("2", 10).unwrap();
    let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"Rocky ⑵"));
    assert!(titles.contains(&"½ Nelson"));
}

#[test]
fn load_rejects_a_snapshot_with_other_fields() {
    use cinedex_core::persist::IndexPaths;
    use cinedex_core::Schema;

    let dir = tempfile::tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    matrix_and_simulation().save(&paths).unwrap();

    let reloaded = Engine::load(&paths, Schema::movies(), FieldBoosts::movies()).unwrap();
    assert_eq!(reloaded.stats().num_docs, 2);
    let other = Schema::new(["title", "tagline"]);
    assert!(matches!(Engine::load(&paths, other, FieldBoosts::movies()), Err(Error::Persist(_))));
}
