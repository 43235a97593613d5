use crate::{Document, Error, Result};
use serde::{Deserialize, Serialize};

/// Field configuration, fixed when the index is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    text_fields: Vec<String>,
    keyword_fields: Vec<String>,
}

impl Schema {
    /// Duplicate names within one set are collapsed, first occurrence wins.
    pub fn new<T, K>(text_fields: T, keyword_fields: K) -> Result<Self>
    where
        T: IntoIterator,
        T::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let text_fields = collect_names(text_fields, "text")?;
        let keyword_fields = collect_names(keyword_fields, "keyword")?;
        if let Some(name) = text_fields.iter().find(|f| keyword_fields.contains(f)) {
            return Err(Error::Schema(format!("field {name:?} is configured as both text and keyword")));
        }
        Ok(Self { text_fields, keyword_fields })
    }

    pub fn text_fields(&self) -> &[String] { &self.text_fields }
    pub fn keyword_fields(&self) -> &[String] { &self.keyword_fields }

    pub fn is_text_field(&self, name: &str) -> bool {
        self.text_fields.iter().any(|f| f == name)
    }

    pub fn is_keyword_field(&self, name: &str) -> bool {
        self.keyword_fields.iter().any(|f| f == name)
    }

    /// Every configured field must be present; empty values are fine.
    pub fn validate(&self, doc: &Document) -> Result<()> {
        for field in self.text_fields.iter().chain(&self.keyword_fields) {
            if doc.get(field).is_none() {
                return Err(Error::Schema(format!("document is missing field {field:?}")));
            }
        }
        Ok(())
    }
}

fn collect_names<I>(names: I, kind: &str) -> Result<Vec<String>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Schema(format!("empty {kind} field name")));
        }
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

/// Free parameters of the saturating term-frequency function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75 } }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(Error::Schema(format!("k1 must be a finite non-negative number, got {}", self.k1)));
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            return Err(Error::Schema(format!("b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}
