use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use csv_async::{AsyncReaderBuilder, Trim};
use futures::{StreamExt, TryStreamExt};
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use crate::codec::Utf8Transcoder;
use crate::source::RowStream;
use crate::tokenizer::Tokenizer;
use crate::DsvResult;

#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// just the key/filename (used for extension fallback)
    pub name_hint: String,
    /// Which character encoding to expect (defaults to UTF-8)
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

impl SourceMeta {
    fn is_gzip(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || self.name_hint.ends_with(".gz")
    }

    fn is_zstd(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "zstd")
            || self.content_type.eq_ignore_ascii_case("application/zstd")
            || self.name_hint.ends_with(".zst")
    }
}

/// Boxed UTF-8 byte reader produced by [`build_text_reader`].
pub type TextReader = Box<dyn AsyncRead + Unpin + Send>;

/// Wraps a raw reader with optional decompression and UTF-8 transcoding.
pub fn build_text_reader<R>(raw: R, meta: &SourceMeta) -> TextReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    // Use a larger buffer for fewer syscalls (1 MiB)
    let buf = BufReader::with_capacity(1 << 20, raw);
    let decompressed: TextReader = if meta.is_gzip() {
        Box::new(GzipDecoder::new(buf))
    } else if meta.is_zstd() {
        Box::new(ZstdDecoder::new(buf))
    } else {
        Box::new(buf)
    };

    if meta.charset == encoding_rs::UTF_8 {
        decompressed
    } else {
        let framed = FramedRead::new(decompressed, Utf8Transcoder::new(meta.charset));
        Box::new(StreamReader::new(framed))
    }
}

/// Guesses content type/encoding from the file extension.
pub fn meta_for_path(path: &Path) -> SourceMeta {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut meta = SourceMeta {
        name_hint: name,
        ..Default::default()
    };

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match ext {
        "gz" => {
            meta.content_type = "application/gzip".into();
            meta.content_encoding = "gzip".into();
        }
        "zst" => {
            meta.content_type = "application/zstd".into();
            meta.content_encoding = "zstd".into();
        }
        "tsv" | "tab" => meta.content_type = "text/tab-separated-values".into(),
        _ => meta.content_type = "text/csv".into(),
    }
    meta
}

/// Opens a local file as a UTF-8 text reader.
pub async fn reader_from_path(path: &Path) -> DsvResult<(TextReader, SourceMeta)> {
    let file = File::open(path).await?;
    let meta = meta_for_path(path);
    let reader = build_text_reader(file, &meta);
    Ok((reader, meta))
}

fn lines_error(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        LinesCodecError::MaxLineLengthExceeded => {
            io::Error::new(io::ErrorKind::InvalidData, "line length limit exceeded")
        }
    }
}

/// Newline-framed lines without their terminators (`\n` or `\r\n`).
pub fn line_stream<R>(reader: R) -> futures::stream::BoxStream<'static, io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    FramedRead::new(reader, LinesCodec::new())
        .map_err(lines_error)
        .boxed()
}

/// Tokenizes every line of `lines`.
pub fn tokenized_rows(
    lines: futures::stream::BoxStream<'static, io::Result<String>>,
    tokenizer: Tokenizer,
) -> RowStream {
    lines
        .map_ok(move |line| tokenizer.tokenize(&line))
        .boxed()
}

/// Pre-split rows from `csv_async`, which also handles quoted fields spanning
/// several physical lines. Blank lines are skipped by the csv reader.
pub fn csv_record_stream<R>(reader: R, delimiter: u8, quote: Option<u8>, trim: bool) -> RowStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let rdr = AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .quote(quote.unwrap_or(b'"'))
        .quoting(quote.is_some())
        .trim(if trim { Trim::All } else { Trim::None })
        // Larger internal buffer reduces syscalls and allocator churn
        .buffer_capacity(1 << 20)
        .create_reader(reader);

    rdr.into_records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        })
        .boxed()
}
