use crate::index::{DocId, PostingsList, Segment};
use crate::query::{ParsedQuery, QueryNode};
use crate::schema::FieldId;
use serde::Serialize;

/// Matching documents with accumulated scores, sorted by doc_id.
type Hits = Vec<(DocId, f32)>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
}

/// `ln(1 + N / df)`
pub fn idf(num_docs: u32, doc_frequency: u32) -> f32 {
    (1.0 + num_docs as f32 / doc_frequency.max(1) as f32).ln()
}

/// Evaluate `query` against one segment and return at most `top_k` documents,
/// best first, ties broken by ascending doc_id. Documents matching no leaf are
/// never returned.
pub fn search(segment: &Segment, query: &ParsedQuery, top_k: usize) -> Vec<ScoredDoc> {
    if top_k == 0 || segment.is_empty() {
        return Vec::new();
    }
    let mut fields = Vec::new();
    for (name, boost) in query.fields.iter() {
        match segment.schema().field_id(name) {
            Some(id) => fields.push((id, boost)),
            None => tracing::debug!(field = name, "ignoring unknown query field"),
        }
    }
    let scorer = Scorer { segment, fields, num_docs: segment.num_docs() };
    let hits = scorer.eval(&query.root);
    tracing::debug!(terms = ?query.root.positive_terms(), total_hits = hits.len(), top_k, "evaluated query");
    top_k_by_score(hits, top_k)
}

struct Scorer<'a> {
    segment: &'a Segment,
    fields: Vec<(FieldId, f32)>,
    num_docs: u32,
}

impl Scorer<'_> {
    fn eval(&self, node: &QueryNode) -> Hits {
        match node {
            QueryNode::Term(term) => self.term(term),
            QueryNode::Phrase(terms) => self.phrase(terms),
            QueryNode::And(children) => {
                let mut iter = children.iter();
                let Some(first) = iter.next() else { return Vec::new() };
                let mut acc = self.eval(first);
                for child in iter {
                    if acc.is_empty() {
                        break;
                    }
                    acc = intersect(&acc, &self.eval(child));
                }
                acc
            }
            QueryNode::Or(children) => {
                children.iter().fold(Vec::new(), |acc, child| union(&acc, &self.eval(child)))
            }
            QueryNode::Exclude { include, exclude } => {
                let included = self.eval(include);
                if included.is_empty() {
                    return included;
                }
                subtract(included, &self.eval(exclude))
            }
            QueryNode::Not(_) | QueryNode::Empty => Vec::new(),
        }
    }

    /// tf * idf * boost per field, summed over the fields containing the term.
    fn term(&self, term: &str) -> Hits {
        let mut acc = Vec::new();
        for &(field, boost) in &self.fields {
            let Some(list) = self.segment.field_postings(field, term) else { continue };
            let weight = idf(self.num_docs, list.doc_frequency()) * boost;
            let hits: Hits = list.iter().map(|p| (p.doc_id, p.term_freq as f32 * weight)).collect();
            acc = union(&acc, &hits);
        }
        acc
    }

    /// phrase_freq * sum(idf) * boost per field where the terms occur adjacently.
    fn phrase(&self, terms: &[String]) -> Hits {
        let mut acc = Vec::new();
        for &(field, boost) in &self.fields {
            let lists: Option<Vec<&PostingsList>> =
                terms.iter().map(|t| self.segment.field_postings(field, t)).collect();
            let Some(lists) = lists else { continue };
            let weight: f32 = lists.iter().map(|l| idf(self.num_docs, l.doc_frequency())).sum::<f32>() * boost;
            let hits: Hits = phrase_matches(&lists)
                .into_iter()
                .map(|(doc_id, freq)| (doc_id, freq as f32 * weight))
                .collect();
            acc = union(&acc, &hits);
        }
        acc
    }
}

/// Docs where the lists' terms appear at consecutive positions, with the number
/// of such occurrences. Candidates come from the first list; the others are
/// advanced with `seek`.
fn phrase_matches(lists: &[&PostingsList]) -> Vec<(DocId, u32)> {
    let mut out = Vec::new();
    let Some((lead, rest)) = lists.split_first() else { return out };
    let mut cursors = vec![0usize; rest.len()];
    'docs: for posting in lead.iter() {
        let mut others = Vec::with_capacity(rest.len());
        for (list, cursor) in rest.iter().zip(cursors.iter_mut()) {
            *cursor = list.seek(*cursor, posting.doc_id);
            match list.as_slice().get(*cursor) {
                Some(p) if p.doc_id == posting.doc_id => others.push(p),
                _ => continue 'docs,
            }
        }
        let freq = posting
            .positions
            .iter()
            .filter(|&&start| {
                others
                    .iter()
                    .enumerate()
                    .all(|(i, p)| p.positions.binary_search(&(start + i as u32 + 1)).is_ok())
            })
            .count() as u32;
        if freq > 0 {
            out.push((posting.doc_id, freq));
        }
    }
    out
}

fn union(a: &[(DocId, f32)], b: &[(DocId, f32)]) -> Hits {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

fn intersect(a: &[(DocId, f32)], b: &[(DocId, f32)]) -> Hits {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out
}

fn subtract(mut a: Hits, b: &[(DocId, f32)]) -> Hits {
    let mut j = 0;
    a.retain(|(doc_id, _)| {
        j += b[j..].partition_point(|(d, _)| d < doc_id);
        !matches!(b.get(j), Some((d, _)) if d == doc_id)
    });
    a
}

/// Score desc, then doc_id asc.
fn top_k_by_score(mut hits: Hits, k: usize) -> Vec<ScoredDoc> {
    let order = |a: &(DocId, f32), b: &(DocId, f32)| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0));
    if hits.len() > k {
        hits.select_nth_unstable_by(k - 1, order);
        hits.truncate(k);
    }
    hits.sort_unstable_by(order);
    hits.into_iter().map(|(doc_id, score)| ScoredDoc { doc_id, score }).collect()
}
