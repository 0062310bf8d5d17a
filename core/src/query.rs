//! Boolean query parsing.
//!
//! Grammar, combined strictly left to right:
//!
//! ```text
//! expr   := unary ((AND | OR)? unary)*      juxtaposition means OR
//! unary  := NOT unary | '(' expr ')' | "phrase" | word
//! ```
//!
//! `&&`, `||` and a leading `!` are accepted as aliases. Operators are only
//! recognised in upper case; `and`/`or`/`not` are ordinary words. Words and
//! phrases go through the same tokenizer as indexed text.

use crate::error::{Error, Result};
use crate::schema::FieldBoosts;
use crate::tokenizer::terms;

const MAX_DEPTH: usize = 64;
/// Upper bound on words and phrases in one query. Alternating operators nest
/// the tree one level per clause, so this also bounds its depth.
pub const MAX_CLAUSES: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Single term, matched in any of the query fields.
    Term(String),
    /// Adjacent terms within one field.
    Phrase(Vec<String>),
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    /// Documents of `include` that do not match `exclude`.
    Exclude { include: Box<QueryNode>, exclude: Box<QueryNode> },
    /// A negation with nothing to subtract from. Matches no documents on its own.
    Not(Box<QueryNode>),
    /// A clause that analyzed to no terms.
    Empty,
}

impl QueryNode {
    /// All terms referenced by positive clauses, in query order.
    pub fn positive_terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryNode::Term(t) => out.push(t),
            QueryNode::Phrase(ts) => out.extend(ts.iter().map(String::as_str)),
            QueryNode::And(children) | QueryNode::Or(children) => {
                children.iter().for_each(|c| c.collect_terms(out))
            }
            QueryNode::Exclude { include, .. } => include.collect_terms(out),
            QueryNode::Not(_) | QueryNode::Empty => {}
        }
    }
}

/// A query tree plus the fields it targets and their boosts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub root: QueryNode,
    pub fields: FieldBoosts,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Phrase(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

/// Parse `query` against the given fields.
pub fn parse(query: &str, fields: &FieldBoosts) -> Result<ParsedQuery> {
    if query.trim().is_empty() {
        return Err(Error::syntax(0, "empty query"));
    }
    let tokens = lex(query)?;
    let mut parser = Parser { tokens, pos: 0, end: query.len(), clauses: 0 };
    let root = parser.expr(0)?;
    if let Some((at, _)) = parser.peek() {
        return Err(Error::syntax(at, "unbalanced ')'"));
    }
    tracing::debug!(query, ?root, "parsed query");
    Ok(ParsedQuery { root, fields: fields.clone() })
}

fn lex(input: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((start, Token::LParen));
            }
            ')' => {
                chars.next();
                tokens.push((start, Token::RParen));
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(c);
                }
                if !closed {
                    return Err(Error::syntax(start, "unterminated quote"));
                }
                tokens.push((start, Token::Phrase(phrase)));
            }
            '!' => {
                chars.next();
                tokens.push((start, Token::Not));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                let token = match word.as_str() {
                    "AND" | "&&" => Token::And,
                    "OR" | "||" => Token::Or,
                    "NOT" => Token::Not,
                    _ => Token::Word(word),
                };
                tokens.push((start, token));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    clauses: usize,
}

impl Parser {
    fn peek(&self) -> Option<(usize, &Token)> {
        self.tokens.get(self.pos).map(|(at, t)| (*at, t))
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self, depth: usize) -> Result<QueryNode> {
        let mut node = self.unary(depth)?;
        loop {
            let op = match self.peek() {
                None | Some((_, Token::RParen)) => break,
                Some((_, Token::And)) => {
                    self.pos += 1;
                    Op::And
                }
                Some((_, Token::Or)) => {
                    self.pos += 1;
                    Op::Or
                }
                Some(_) => Op::Or,
            };
            let right = self.unary(depth)?;
            node = combine(op, node, right);
        }
        Ok(node)
    }

    fn unary(&mut self, depth: usize) -> Result<QueryNode> {
        if depth > MAX_DEPTH {
            return Err(Error::syntax(self.peek().map_or(self.end, |(at, _)| at), "query nested too deeply"));
        }
        let Some((at, token)) = self.next() else {
            return Err(Error::syntax(self.end, "dangling operator: expected a term"));
        };
        if matches!(token, Token::Word(_) | Token::Phrase(_)) {
            self.clauses += 1;
            if self.clauses > MAX_CLAUSES {
                return Err(Error::syntax(at, format!("too many clauses (max {MAX_CLAUSES})")));
            }
        }
        match token {
            Token::Word(word) => Ok(analyze_word(&word)),
            Token::Phrase(phrase) => Ok(analyze_phrase(&phrase)),
            Token::Not => Ok(negate(self.unary(depth + 1)?)),
            Token::LParen => {
                if let Some((_, Token::RParen)) = self.peek() {
                    return Err(Error::syntax(at, "empty group"));
                }
                let inner = self.expr(depth + 1)?;
                match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    _ => Err(Error::syntax(at, "unbalanced '('")),
                }
            }
            Token::RParen => Err(Error::syntax(at, "unbalanced ')'")),
            Token::And | Token::Or => Err(Error::syntax(at, "dangling operator")),
        }
    }
}

fn analyze_word(word: &str) -> QueryNode {
    let mut ts: Vec<QueryNode> = terms(word).map(QueryNode::Term).collect();
    match ts.len() {
        0 => QueryNode::Empty,
        1 => ts.remove(0),
        _ => QueryNode::Or(ts),
    }
}

fn analyze_phrase(phrase: &str) -> QueryNode {
    let mut ts: Vec<String> = terms(phrase).collect();
    match ts.len() {
        0 => QueryNode::Empty,
        1 => QueryNode::Term(ts.remove(0)),
        _ => QueryNode::Phrase(ts),
    }
}

fn negate(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::Empty => QueryNode::Empty,
        QueryNode::Not(inner) => *inner,
        other => QueryNode::Not(Box::new(other)),
    }
}

/// Joining anything with a negated clause subtracts it, whatever the operator.
fn combine(op: Op, left: QueryNode, right: QueryNode) -> QueryNode {
    match (left, right) {
        (QueryNode::Empty, other) | (other, QueryNode::Empty) => other,
        (QueryNode::Not(a), QueryNode::Not(b)) => QueryNode::Not(Box::new(join(Op::Or, *a, *b))),
        (include, QueryNode::Not(exclude)) | (QueryNode::Not(exclude), include) => {
            QueryNode::Exclude { include: Box::new(include), exclude }
        }
        (l, r) => join(op, l, r),
    }
}

fn join(op: Op, left: QueryNode, right: QueryNode) -> QueryNode {
    let mut children = Vec::new();
    for node in [left, right] {
        match (op, node) {
            (Op::And, QueryNode::And(inner)) | (Op::Or, QueryNode::Or(inner)) => children.extend(inner),
            (_, node) => children.push(node),
        }
    }
    match op {
        Op::And => QueryNode::And(children),
        Op::Or => QueryNode::Or(children),
    }
}
