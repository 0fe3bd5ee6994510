//! Forward-only tabular model with bounded memory.
//!
//! Rows are pulled a chunk at a time from a [`ChunkedRows`] source, run
//! through header resolution (once) and width normalization (every row), and
//! handed out through one internal cursor. Raw, read-ahead and withheld
//! footer rows together never exceed `max(chunk_size, skip_footer_rows + 1)`,
//! whatever the input length.

use futures::stream::{self, Stream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::infer::{profile_values, DataType};
use crate::io::{csv_record_stream, line_stream, reader_from_path, tokenized_rows};
use crate::options::DsvOptions;
use crate::schema::{is_blank, normalize_row, placeholder_names, resolve_header, Row, Schema};
use crate::source::{ChunkedRows, RowStream};
use crate::{DsvError, DsvResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unstarted,
    HeaderAccumulating,
    Streaming,
    Exhausted,
}

pub struct StreamingTabularModel {
    source: ChunkedRows<Vec<String>>,
    header_rows: usize,
    name_rows: usize,
    skip_empty_rows: bool,
    chunk_size: usize,
    // Ceiling on pending + buffer + footer window.
    resident_bound: usize,
    state: ModelState,
    header_data: Vec<Vec<String>>,
    schema: Arc<Schema>,
    // Raw rows of the chunk currently being consumed.
    pending: VecDeque<Vec<String>>,
    // Normalized rows read ahead by the buffer accessors.
    buffer: VecDeque<Row>,
    column_types: HashMap<String, DataType>,
    rows_emitted: u64,
    in_traversal: bool,
}

impl std::fmt::Debug for StreamingTabularModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingTabularModel")
            .field("state", &self.state)
            .field("columns", &self.schema.names())
            .field("buffered", &self.buffer.len())
            .field("rows_emitted", &self.rows_emitted)
            .finish()
    }
}

impl StreamingTabularModel {
    /// Wraps a stream of pre-split rows.
    pub fn new(rows: RowStream, options: &DsvOptions) -> DsvResult<Self> {
        options.validate()?;
        Ok(Self {
            source: ChunkedRows::new(rows, options.chunking())?,
            header_rows: options.header_rows,
            name_rows: options.name_rows(),
            skip_empty_rows: options.skip_empty_rows,
            chunk_size: options.chunk_size,
            resident_bound: options.chunk_size.max(options.skip_footer_rows + 1),
            state: ModelState::Unstarted,
            header_data: Vec::new(),
            schema: Arc::new(Schema::empty()),
            pending: VecDeque::new(),
            buffer: VecDeque::new(),
            column_types: HashMap::new(),
            rows_emitted: 0,
            in_traversal: false,
        })
    }

    /// Tokenizes newline-framed text from `reader` with the configured tokenizer.
    pub fn from_reader<R>(reader: R, options: &DsvOptions) -> DsvResult<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        options.validate()?;
        let rows = tokenized_rows(line_stream(reader), options.tokenizer()?);
        Self::new(rows, options)
    }

    /// Reads rows with `csv_async`; needs a single-byte delimiter.
    pub fn from_csv_reader<R>(reader: R, options: &DsvOptions) -> DsvResult<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        options.validate()?;
        let (delimiter, quote) = options.csv_bytes()?;
        let rows = csv_record_stream(reader, delimiter, quote, options.strip_fields);
        Self::new(rows, options)
    }

    /// Opens a local file (gzip/zstd by extension).
    pub async fn open(path: &Path, options: &DsvOptions) -> DsvResult<Self> {
        options.validate()?;
        let (reader, meta) = reader_from_path(path).await?;
        tracing::debug!(
            path = %path.display(),
            content_type = %meta.content_type,
            content_encoding = %meta.content_encoding,
            "opened source"
        );
        Self::from_reader(reader, options)
    }

    /// In-memory rows, mostly for tests and small inputs.
    pub fn from_rows(rows: Vec<Vec<String>>, options: &DsvOptions) -> DsvResult<Self> {
        let rows = stream::iter(rows.into_iter().map(Ok)).boxed();
        Self::new(rows, options)
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Current schema; a state error until the header has been resolved.
    pub fn schema(&self) -> DsvResult<&Arc<Schema>> {
        match self.state {
            ModelState::Unstarted | ModelState::HeaderAccumulating => Err(DsvError::State(
                "header has not been resolved yet".into(),
            )),
            ModelState::Streaming | ModelState::Exhausted => Ok(&self.schema),
        }
    }

    pub fn column_names(&self) -> DsvResult<&[String]> {
        Ok(self.schema()?.names())
    }

    pub fn column_count(&self) -> DsvResult<usize> {
        Ok(self.schema()?.len())
    }

    pub fn column_index(&self, name: &str) -> DsvResult<usize> {
        self.schema()?
            .index_of(name)
            .ok_or_else(|| DsvError::UnknownColumn(name.to_string()))
    }

    /// Resolves the header if needed and returns the column names.
    pub async fn header(&mut self) -> DsvResult<&[String]> {
        self.ensure_header().await?;
        Ok(self.schema.names())
    }

    /// Raw header rows as read, before merging.
    pub fn header_data(&self) -> &[Vec<String>] {
        &self.header_data
    }

    /// Rows handed to the consumer so far.
    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    /// Normalized rows currently read ahead.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Rows currently withheld as a potential footer.
    pub fn withheld_len(&self) -> usize {
        self.source.withheld()
    }

    /// Every row the model holds right now: raw rows of the current chunk,
    /// read-ahead rows and the footer window. Never above
    /// [`resident_bound`](Self::resident_bound).
    pub fn resident_len(&self) -> usize {
        self.pending.len() + self.buffer.len() + self.source.withheld()
    }

    /// `max(chunk_size, skip_footer_rows + 1)`.
    pub fn resident_bound(&self) -> usize {
        self.resident_bound
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Next row in order of appearance.
    pub async fn next_row(&mut self) -> DsvResult<Option<Row>> {
        self.ensure_header().await?;
        if self.state == ModelState::Exhausted {
            return Ok(None);
        }
        let row = match self.buffer.pop_front() {
            Some(row) => Some(row),
            None => self.advance().await?,
        };
        match row {
            Some(row) => {
                self.rows_emitted += 1;
                Ok(Some(row))
            }
            None => {
                debug_assert!(self.source.is_exhausted());
                self.finish();
                Ok(None)
            }
        }
    }

    /// Next row as a name → value map, keyed by that row's own schema.
    pub async fn next_record(&mut self) -> DsvResult<Option<HashMap<String, String>>> {
        Ok(self.next_row().await?.map(|row| row.record().to_map()))
    }

    /// Next row as a fixed-length tuple.
    pub async fn next_tuple(&mut self) -> DsvResult<Option<Box<[String]>>> {
        Ok(self.next_row().await?.map(Row::into_tuple))
    }

    /// Starts a traversal. Only one may be active per model.
    pub fn traverse(&mut self) -> DsvResult<Traversal<'_>> {
        if self.in_traversal {
            return Err(DsvError::State("a traversal is already in progress".into()));
        }
        self.in_traversal = true;
        Ok(Traversal { model: self })
    }

    /// Consumes the model into a stream of rows.
    pub fn into_stream(self) -> impl Stream<Item = DsvResult<Row>> + Send {
        stream::try_unfold(self, |mut model| async move {
            Ok(model.next_row().await?.map(|row| (row, model)))
        })
    }

    /// Reads ahead until the buffer holds `chunk_size` rows, the resident
    /// bound is reached or input ends.
    async fn fill_buffer(&mut self) -> DsvResult<()> {
        self.ensure_header().await?;
        if self.state == ModelState::Exhausted {
            return Ok(());
        }
        while self.buffer.len() < self.chunk_size {
            match self.advance().await? {
                Some(row) => self.buffer.push_back(row),
                None => break,
            }
        }
        Ok(())
    }

    /// Row `index` of the buffer (0 = next row to be emitted).
    pub async fn buffered_row(&mut self, index: usize) -> DsvResult<&Row> {
        self.fill_buffer().await?;
        let len = self.buffer.len();
        self.buffer
            .get(index)
            .ok_or(DsvError::RowOutOfRange { index, len })
    }

    pub async fn buffered_record(&mut self, index: usize) -> DsvResult<HashMap<String, String>> {
        self.fill_buffer().await?;
        let len = self.buffer.len();
        let row = self
            .buffer
            .get(index)
            .ok_or(DsvError::RowOutOfRange { index, len })?;
        // Pad rows normalized before a later widening.
        Ok(self
            .schema
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), row.get(i).unwrap_or_default().to_string()))
            .collect())
    }

    pub async fn buffered_cell(&mut self, name: &str, index: usize) -> DsvResult<&str> {
        self.fill_buffer().await?;
        let col = self.column_index(name)?;
        let len = self.buffer.len();
        let row = self
            .buffer
            .get(index)
            .ok_or(DsvError::RowOutOfRange { index, len })?;
        Ok(row.get(col).unwrap_or_default())
    }

    /// Values of column `name` across the buffered rows.
    pub async fn buffered_column_values(&mut self, name: &str) -> DsvResult<Vec<String>> {
        self.fill_buffer().await?;
        let col = self.column_index(name)?;
        Ok(self
            .buffer
            .iter()
            .map(|row| row.get(col).unwrap_or_default().to_string())
            .collect())
    }

    /// Type of column `name`, inferred from the buffered rows and cached.
    pub async fn column_type(&mut self, name: &str) -> DsvResult<DataType> {
        if let Some(kind) = self.column_types.get(name) {
            return Ok(*kind);
        }
        let values = self.buffered_column_values(name).await?;
        let kind = profile_values(values.iter().map(String::as_str));
        self.column_types.insert(name.to_string(), kind);
        Ok(kind)
    }

    /// Drops read-ahead rows without emitting them.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Pulls one chunk into `pending` without passing the resident bound.
    ///
    /// False once the source is exhausted or there is no room left. With an
    /// empty buffer and `pending` there is always room for at least one row.
    async fn pull_chunk(&mut self) -> DsvResult<bool> {
        let room = self.resident_bound.saturating_sub(self.resident_len());
        if room == 0 {
            return Ok(false);
        }
        match self.source.next_chunk_within(room).await? {
            Some(chunk) => {
                self.pending.extend(chunk);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ensure_header(&mut self) -> DsvResult<()> {
        match self.state {
            ModelState::Streaming | ModelState::Exhausted => return Ok(()),
            ModelState::Unstarted => self.state = ModelState::HeaderAccumulating,
            ModelState::HeaderAccumulating => {}
        }

        while self.header_data.len() < self.header_rows {
            match self.pending.pop_front() {
                Some(row) => self.header_data.push(row),
                None => {
                    if !self.pull_chunk().await? {
                        break;
                    }
                }
            }
        }

        let names = if self.header_rows > 0 {
            resolve_header(&self.header_data, self.name_rows)
        } else {
            placeholder_names(self.first_data_width().await?)
        };
        self.schema = Arc::new(Schema::new(names));
        self.state = ModelState::Streaming;
        tracing::debug!(
            header_rows = self.header_data.len(),
            columns = self.schema.len(),
            "header resolved"
        );
        Ok(())
    }

    /// Width of the first row that will be emitted, 0 for empty input.
    async fn first_data_width(&mut self) -> DsvResult<usize> {
        loop {
            if self.skip_empty_rows {
                while self.pending.front().is_some_and(|r| is_blank(r)) {
                    self.pending.pop_front();
                }
            }
            if let Some(row) = self.pending.front() {
                return Ok(row.len());
            }
            if !self.pull_chunk().await? {
                return Ok(0);
            }
        }
    }

    /// Normalizes the next non-skipped source row; `None` when input is
    /// exhausted or the resident bound leaves no room to read further.
    async fn advance(&mut self) -> DsvResult<Option<Row>> {
        loop {
            let Some(fields) = self.pending.pop_front() else {
                if !self.pull_chunk().await? {
                    return Ok(None);
                }
                continue;
            };
            if self.skip_empty_rows && is_blank(&fields) {
                continue;
            }
            return Ok(Some(normalize_row(fields, &mut self.schema)));
        }
    }

    fn finish(&mut self) {
        if self.state == ModelState::Exhausted {
            return;
        }
        self.state = ModelState::Exhausted;
        self.pending = VecDeque::new();
        self.buffer = VecDeque::new();
        tracing::debug!(
            rows = self.rows_emitted,
            columns = self.schema.len(),
            "stream exhausted"
        );
    }
}

/// The single active cursor over a [`StreamingTabularModel`].
///
/// Projections are views over the same cursor: mixing them advances one
/// shared position.
pub struct Traversal<'m> {
    model: &'m mut StreamingTabularModel,
}

impl Traversal<'_> {
    pub async fn next_row(&mut self) -> DsvResult<Option<Row>> {
        self.model.next_row().await
    }

    pub async fn next_record(&mut self) -> DsvResult<Option<HashMap<String, String>>> {
        self.model.next_record().await
    }

    pub async fn next_tuple(&mut self) -> DsvResult<Option<Box<[String]>>> {
        self.model.next_tuple().await
    }

    /// Drains the rest of the input.
    pub async fn collect_rows(&mut self) -> DsvResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.model.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn model(&self) -> &StreamingTabularModel {
        self.model
    }
}

impl Drop for Traversal<'_> {
    fn drop(&mut self) {
        self.model.in_traversal = false;
    }
}
