//! Column schema, header resolution and row width normalization.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Generated name for column `index`.
pub fn placeholder(index: usize) -> String {
    format!("column_{index}")
}

/// `column_0 .. column_{count-1}`.
pub fn placeholder_names(count: usize) -> Vec<String> {
    (0..count).map(placeholder).collect()
}

/// Ordered, unique column names.
///
/// A schema is never mutated in place once shared: widening builds a new
/// value with a higher `version`, so rows keep the names they were read under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    names: Vec<String>,
    index: HashMap<String, usize>,
    version: u32,
}

impl Schema {
    /// Builds a schema, disambiguating duplicate names.
    pub fn new(names: Vec<String>) -> Self {
        let names = dedupe(names);
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            names,
            index,
            version: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Bumped each time the schema is widened.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Copy of `self` widened to `width` columns with placeholder names.
    ///
    /// A placeholder that collides with a header-derived name is suffixed
    /// like any other duplicate.
    pub fn widened(&self, width: usize) -> Self {
        if width <= self.len() {
            return self.clone();
        }
        let mut names = self.names.clone();
        let mut taken: HashSet<String> = names.iter().cloned().collect();
        for i in self.len()..width {
            let name = unique_name(placeholder(i), &mut taken);
            names.push(name);
        }
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            names,
            index,
            version: self.version + 1,
        }
    }
}

/// Collapses whitespace runs to one space and trims.
fn clean(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unique_name(base: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}_{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Makes every name unique; later duplicates get `_2`, `_3`, ...
pub fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut taken = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .map(|n| unique_name(n, &mut taken))
        .collect()
}

/// Merges header rows into one name per column.
///
/// The first `name_rows` rows contribute; non-empty values at the same index
/// are joined with `_`. Width is that of the widest header row. Blank names
/// become `column_<index>` and duplicates are disambiguated.
pub fn resolve_header(rows: &[Vec<String>], name_rows: usize) -> Vec<String> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let contributing = &rows[..name_rows.min(rows.len())];

    let names = (0..width)
        .map(|col| {
            let parts: Vec<String> = contributing
                .iter()
                .filter_map(|row| row.get(col))
                .map(|v| clean(v))
                .filter(|v| !v.is_empty())
                .collect();
            if parts.is_empty() {
                placeholder(col)
            } else {
                parts.join("_")
            }
        })
        .collect();
    dedupe(names)
}

/// A normalized row plus the schema it was normalized under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
    schema: Arc<Schema>,
}

impl Row {
    /// Caller guarantees `values.len() == schema.len()`.
    pub(crate) fn with_schema(values: Vec<String>, schema: Arc<Schema>) -> Self {
        debug_assert_eq!(values.len(), schema.len());
        Self { values, schema }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Value under column `name` in this row's own schema.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.schema.index_of(name).and_then(|i| self.get(i))
    }

    /// Name-keyed view of this row.
    pub fn record(&self) -> Record<'_> {
        Record { row: self }
    }

    pub fn to_tuple(&self) -> Box<[String]> {
        self.values.clone().into_boxed_slice()
    }

    pub fn into_tuple(self) -> Box<[String]> {
        self.values.into_boxed_slice()
    }
}

/// Borrowed name → value view over a [`Row`].
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    row: &'a Row,
}

impl<'a> Record<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let row = self.row;
        row.schema.index_of(name).and_then(|i| row.get(i))
    }

    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let row = self.row;
        row.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(row.values.iter().map(String::as_str))
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Whether every field is blank after trimming (zero fields counts as blank).
pub fn is_blank(fields: &[String]) -> bool {
    fields.iter().all(|f| f.trim().is_empty())
}

/// Pads `fields` to the schema width, or widens `schema` when `fields` is
/// wider. Growth is monotonic.
pub fn normalize_row(mut fields: Vec<String>, schema: &mut Arc<Schema>) -> Row {
    if fields.len() > schema.len() {
        let from = schema.len();
        *schema = Arc::new(schema.widened(fields.len()));
        tracing::debug!(from, to = schema.len(), "schema widened");
    } else if fields.len() < schema.len() {
        fields.resize(schema.len(), String::new());
    }
    Row {
        values: fields,
        schema: Arc::clone(schema),
    }
}
