use crate::source::{ChunkingOptions, MIN_CHUNK_SIZE};
use crate::tokenizer::Tokenizer;
use crate::{DsvError, DsvResult};

/// Constructor-time settings shared by every model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsvOptions {
    /// Field separator; may be more than one character.
    pub delimiter: String,
    /// Quote character; `None` disables quoting.
    pub quote: Option<char>,
    /// Trim whitespace around each field.
    pub strip_fields: bool,
    /// Leading rows that make up the header (0 = synthesize `column_N`).
    pub header_rows: usize,
    /// How many of the header rows contribute to column names.
    /// `None` means all of them.
    pub column_name_rows: Option<usize>,
    /// Raw rows dropped before header resolution begins.
    pub skip_header_rows: usize,
    /// Rows withheld from the end of the input.
    pub skip_footer_rows: usize,
    /// Buffer and refill granularity.
    pub chunk_size: usize,
    /// Drop rows whose fields are all blank.
    pub skip_empty_rows: bool,
}

impl Default for DsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".into(),
            quote: Some('"'),
            strip_fields: true,
            header_rows: 1,
            column_name_rows: None,
            skip_header_rows: 0,
            skip_footer_rows: 0,
            chunk_size: 1000,
            skip_empty_rows: true,
        }
    }
}

impl DsvOptions {
    /// Tab-separated defaults.
    pub fn tsv() -> Self {
        Self {
            delimiter: "\t".into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> DsvResult<()> {
        if self.delimiter.is_empty() {
            return Err(DsvError::Config("delimiter must not be empty".into()));
        }
        if let Some(q) = self.quote {
            if self.delimiter.contains(q) {
                return Err(DsvError::Config(format!(
                    "quote character {q:?} conflicts with delimiter {:?}",
                    self.delimiter
                )));
            }
        }
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(DsvError::Config(format!(
                "chunk_size must be at least {MIN_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        match self.column_name_rows {
            Some(0) if self.header_rows > 0 => Err(DsvError::Config(
                "column_name_rows must be greater than 0 when header_rows is greater than 0".into(),
            )),
            Some(n) if n > self.header_rows => Err(DsvError::Config(format!(
                "column_name_rows ({n}) exceeds header_rows ({})",
                self.header_rows
            ))),
            _ => Ok(()),
        }
    }

    /// Header rows that feed column names.
    pub fn name_rows(&self) -> usize {
        self.column_name_rows.unwrap_or(self.header_rows)
    }

    pub fn tokenizer(&self) -> DsvResult<Tokenizer> {
        Ok(Tokenizer::new(self.delimiter.clone())?
            .strip(self.strip_fields)
            .quote(self.quote))
    }

    pub fn chunking(&self) -> ChunkingOptions {
        ChunkingOptions {
            skip_header_rows: self.skip_header_rows,
            skip_footer_rows: self.skip_footer_rows,
            chunk_size: self.chunk_size,
        }
    }

    /// Single-byte delimiter/quote for the csv reader, if representable.
    pub(crate) fn csv_bytes(&self) -> DsvResult<(u8, Option<u8>)> {
        let delim = match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => *b,
            _ => {
                return Err(DsvError::Config(format!(
                    "csv reader needs a single ASCII delimiter, got {:?}",
                    self.delimiter
                )))
            }
        };
        let quote = match self.quote {
            Some(q) if q.is_ascii() => Some(q as u8),
            Some(q) => {
                return Err(DsvError::Config(format!(
                    "csv reader needs an ASCII quote character, got {q:?}"
                )))
            }
            None => None,
        };
        Ok((delim, quote))
    }
}
