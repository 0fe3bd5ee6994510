//! Fully materialized tabular models with random access.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::infer::{DataType, TypeInference, TypedValue, ValueProfiler};
use crate::options::DsvOptions;
use crate::schema::{is_blank, placeholder_names, resolve_header, Record, Row, Schema};
use crate::source::{ChunkedRows, RowStream};
use crate::{io, DsvError, DsvResult};

/// All rows resident, normalized to one schema.
#[derive(Debug, Clone)]
pub struct TabularDataModel {
    header_data: Vec<Vec<String>>,
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl TabularDataModel {
    /// Builds from already split rows (header rows included).
    pub fn new(mut rows: Vec<Vec<String>>, options: &DsvOptions) -> DsvResult<Self> {
        options.validate()?;
        let split = options.header_rows.min(rows.len());
        let data = rows.split_off(split);
        let header_data = rows;

        let data: Vec<Vec<String>> = data
            .into_iter()
            .filter(|r| !(options.skip_empty_rows && is_blank(r)))
            .collect();
        let data_width = data.iter().map(Vec::len).max().unwrap_or(0);

        let names = if options.header_rows > 0 {
            resolve_header(&header_data, options.name_rows())
        } else {
            placeholder_names(data.first().map_or(0, Vec::len))
        };
        let schema = Schema::new(names);
        let schema = Arc::new(schema.widened(data_width));

        let rows = data
            .into_iter()
            .map(|mut fields| {
                fields.resize(schema.len(), String::new());
                Row::with_schema(fields, Arc::clone(&schema))
            })
            .collect();

        Ok(Self {
            header_data,
            schema,
            rows,
        })
    }

    /// Drains a row stream, honoring header/footer skipping.
    pub async fn from_stream(rows: RowStream, options: &DsvOptions) -> DsvResult<Self> {
        options.validate()?;
        let mut source = ChunkedRows::new(rows, options.chunking())?;
        let mut all = Vec::new();
        while let Some(chunk) = source.next_chunk().await? {
            all.extend(chunk);
        }
        tracing::debug!(rows = all.len(), "materialized input");
        Self::new(all, options)
    }

    /// Reads and tokenizes a whole local file.
    pub async fn load(path: &Path, options: &DsvOptions) -> DsvResult<Self> {
        options.validate()?;
        let (reader, _meta) = io::reader_from_path(path).await?;
        let rows = io::tokenized_rows(io::line_stream(reader), options.tokenizer()?);
        Self::from_stream(rows, options).await
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn column_names(&self) -> &[String] {
        self.schema.names()
    }

    pub fn header_data(&self) -> &[Vec<String>] {
        &self.header_data
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    pub fn column_index(&self, name: &str) -> DsvResult<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| DsvError::UnknownColumn(name.to_string()))
    }

    fn get_row(&self, index: usize) -> DsvResult<&Row> {
        self.rows.get(index).ok_or(DsvError::RowOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    fn check_column(&self, index: usize) -> DsvResult<usize> {
        if index < self.schema.len() {
            Ok(index)
        } else {
            Err(DsvError::ColumnOutOfRange {
                index,
                len: self.schema.len(),
            })
        }
    }

    /// Row `index` as a name-keyed view.
    pub fn row(&self, index: usize) -> DsvResult<Record<'_>> {
        Ok(self.get_row(index)?.record())
    }

    pub fn row_values(&self, index: usize) -> DsvResult<&[String]> {
        Ok(self.get_row(index)?.values())
    }

    pub fn row_tuple(&self, index: usize) -> DsvResult<Box<[String]>> {
        Ok(self.get_row(index)?.to_tuple())
    }

    pub fn cell(&self, row: usize, column: usize) -> DsvResult<&str> {
        let column = self.check_column(column)?;
        Ok(self.get_row(row)?.get(column).unwrap_or_default())
    }

    pub fn cell_by_name(&self, row: usize, name: &str) -> DsvResult<&str> {
        let column = self.column_index(name)?;
        self.cell(row, column)
    }

    pub fn column_values(&self, name: &str) -> DsvResult<Vec<&str>> {
        let column = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.get(column).unwrap_or_default())
            .collect())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(Row::record)
    }
}

impl<'a> IntoIterator for &'a TabularDataModel {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// A [`TabularDataModel`] with one inferred [`DataType`] per column.
pub struct TypedTabularModel<I = ValueProfiler> {
    model: TabularDataModel,
    column_types: Vec<DataType>,
    inference: I,
}

impl TypedTabularModel<ValueProfiler> {
    pub fn new(model: TabularDataModel) -> Self {
        Self::with_inference(model, ValueProfiler)
    }
}

impl<I: TypeInference> TypedTabularModel<I> {
    /// Profiles every column once with `inference`.
    pub fn with_inference(model: TabularDataModel, inference: I) -> Self {
        let column_types = (0..model.column_count())
            .map(|col| {
                let values: Vec<&str> = model
                    .rows
                    .iter()
                    .map(|r| r.get(col).unwrap_or_default())
                    .collect();
                inference.profile(&values)
            })
            .collect();
        Self {
            model,
            column_types,
            inference,
        }
    }

    pub fn model(&self) -> &TabularDataModel {
        &self.model
    }

    pub fn into_inner(self) -> TabularDataModel {
        self.model
    }

    pub fn column_types(&self) -> HashMap<&str, DataType> {
        self.model
            .column_names()
            .iter()
            .map(String::as_str)
            .zip(self.column_types.iter().copied())
            .collect()
    }

    pub fn column_type(&self, name: &str) -> DsvResult<DataType> {
        Ok(self.column_types[self.model.column_index(name)?])
    }

    pub fn typed_cell(&self, row: usize, column: usize) -> DsvResult<TypedValue> {
        let raw = self.model.cell(row, column)?;
        Ok(self.inference.coerce(self.column_types[column], raw))
    }

    pub fn typed_row(&self, index: usize) -> DsvResult<Vec<TypedValue>> {
        let row = self.model.get_row(index)?;
        Ok(self
            .column_types
            .iter()
            .enumerate()
            .map(|(col, kind)| {
                self.inference
                    .coerce(*kind, row.get(col).unwrap_or_default())
            })
            .collect())
    }

    pub fn typed_column(&self, name: &str) -> DsvResult<Vec<TypedValue>> {
        let column = self.model.column_index(name)?;
        let kind = self.column_types[column];
        Ok(self
            .model
            .rows
            .iter()
            .map(|r| self.inference.coerce(kind, r.get(column).unwrap_or_default()))
            .collect())
    }
}
