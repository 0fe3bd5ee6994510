//! Whole-file helpers built on the same reader and chunked source as the models.

use futures::{StreamExt, TryStreamExt};
use std::path::Path;

use crate::io::{line_stream, reader_from_path};
use crate::source::{ChunkedRows, ChunkingOptions};
use crate::{DsvError, DsvResult};

/// Line handling for [`preview`] and [`load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOptions {
    /// Trim surrounding whitespace from every line.
    pub strip: bool,
    pub skip_header_rows: usize,
    pub skip_footer_rows: usize,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            strip: true,
            skip_header_rows: 0,
            skip_footer_rows: 0,
        }
    }
}

fn finish_line(line: String, strip: bool) -> String {
    if strip {
        line.trim().to_string()
    } else {
        line
    }
}

/// Number of lines in the file.
pub async fn line_count(path: &Path) -> DsvResult<usize> {
    let (reader, _meta) = reader_from_path(path).await?;
    let count = line_stream(reader)
        .try_fold(0usize, |n, _| async move { Ok(n + 1) })
        .await?;
    Ok(count)
}

/// Up to `max_lines` lines after `skip_header_rows`. Footer skipping does not
/// apply to a preview.
pub async fn preview(path: &Path, max_lines: usize, options: LineOptions) -> DsvResult<Vec<String>> {
    if max_lines < 1 {
        return Err(DsvError::Config("max_lines must be at least 1".into()));
    }
    let (reader, _meta) = reader_from_path(path).await?;
    let lines: Vec<String> = line_stream(reader)
        .skip(options.skip_header_rows)
        .take(max_lines)
        .map_ok(|l| finish_line(l, options.strip))
        .try_collect()
        .await?;
    Ok(lines)
}

/// Every line, minus skipped header and footer rows.
pub async fn load(path: &Path, options: LineOptions) -> DsvResult<Vec<String>> {
    let (reader, _meta) = reader_from_path(path).await?;
    let strip = options.strip;
    let lines = line_stream(reader)
        .map_ok(move |l| finish_line(l, strip))
        .boxed();
    let mut source = ChunkedRows::new(
        lines,
        ChunkingOptions {
            skip_header_rows: options.skip_header_rows,
            skip_footer_rows: options.skip_footer_rows,
            chunk_size: 1024,
        },
    )?;
    let mut out = Vec::new();
    while let Some(chunk) = source.next_chunk().await? {
        out.extend(chunk);
    }
    Ok(out)
}
