use memchr::memchr_iter;
use memmap2::MmapOptions;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::DsvResult;

/// Line count of an uncompressed local file using mmap and parallel chunking.
///
/// Counts `\n` terminators, plus one for a trailing line without a newline,
/// which matches [`crate::text_file::line_count`] on the same input.
pub fn fast_line_count(path: &Path) -> DsvResult<usize> {
    let file = File::open(path)?;
    let len = file.metadata()?.len() as usize;
    if len == 0 {
        return Ok(0);
    }
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let data: &[u8] = &mmap[..];

    // Split on newline boundaries so every worker sees whole lines.
    let cores = num_cpus::get().max(1);
    let approx = (len / cores).max(1);
    let mut starts = Vec::with_capacity(cores + 1);
    starts.push(0usize);
    let mut pos = approx;
    while starts.len() < cores && pos < len {
        let next = memchr_iter(b'\n', &data[pos..])
            .next()
            .map(|off| pos + off + 1)
            .unwrap_or(len);
        if next >= len {
            break;
        }
        starts.push(next);
        pos = next + approx;
    }
    starts.push(len);

    let total = AtomicUsize::new(0);
    thread::scope(|s| {
        let total_ref = &total;
        for w in starts.windows(2) {
            let slice = &data[w[0]..w[1]];
            s.spawn(move || {
                let count = memchr_iter(b'\n', slice).count();
                total_ref.fetch_add(count, Ordering::Relaxed);
            });
        }
    });

    let mut lines = total.load(Ordering::Relaxed);
    if data.last() != Some(&b'\n') {
        lines += 1;
    }
    tracing::trace!(lines, workers = starts.len() - 1, "fast line count");
    Ok(lines)
}
