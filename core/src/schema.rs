use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub type FieldId = usize;

pub const TITLE: &str = "title";
pub const OVERVIEW: &str = "overview";

/// Ordered list of indexed + stored text fields. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(Into::into).collect() }
    }

    /// `title` and `overview`, in that order.
    pub fn movies() -> Self {
        Self::new([TITLE, OVERVIEW])
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::movies()
    }
}

/// Per-field score multipliers, in query field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBoosts(Vec<(String, f32)>);

impl FieldBoosts {
    pub const DEFAULT_BOOST: f32 = 1.0;

    pub fn new<I, S>(boosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut out: Vec<(String, f32)> = Vec::new();
        for (field, boost) in boosts {
            let field = field.into();
            if !boost.is_finite() || boost <= 0.0 {
                return Err(Error::InvalidBoost { field, boost });
            }
            match out.iter_mut().find(|(f, _)| *f == field) {
                Some(slot) => slot.1 = boost,
                None => out.push((field, boost)),
            }
        }
        Ok(Self(out))
    }

    /// `title: 2.0, overview: 1.0`.
    pub fn movies() -> Self {
        Self(vec![(TITLE.to_string(), 2.0), (OVERVIEW.to_string(), 1.0)])
    }

    pub fn get(&self, field: &str) -> f32 {
        self.0.iter().find(|(f, _)| f == field).map(|(_, b)| *b).unwrap_or(Self::DEFAULT_BOOST)
    }

    /// Replace the boost of `field` (appending it if absent).
    pub fn with(mut self, field: &str, boost: f32) -> Result<Self> {
        if !boost.is_finite() || boost <= 0.0 {
            return Err(Error::InvalidBoost { field: field.to_string(), boost });
        }
        match self.0.iter_mut().find(|(f, _)| f == field) {
            Some(slot) => slot.1 = boost,
            None => self.0.push((field.to_string(), boost)),
        }
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(f, b)| (f.as_str(), *b))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldBoosts {
    fn default() -> Self {
        Self::movies()
    }
}
