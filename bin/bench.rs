use clap::{Arg, ArgAction, Command};
use crc32fast::Hasher as Crc32;
use dsv_ingest::{DsvOptions, StreamingTabularModel};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let matches = Command::new("bench")
        .arg(Arg::new("path").long("path").required(true).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("delim").long("delim").default_value(","))
        .arg(Arg::new("header-rows").long("header-rows").value_parser(clap::value_parser!(usize)).default_value("1"))
        .arg(Arg::new("skip-footer").long("skip-footer").value_parser(clap::value_parser!(usize)).default_value("0"))
        .arg(Arg::new("chunk-size").long("chunk-size").value_parser(clap::value_parser!(usize)).default_value("1000"))
        .arg(Arg::new("csv").long("csv").help("Split rows with csv_async instead of the line tokenizer").action(ArgAction::SetTrue))
        .arg(Arg::new("verify").long("verify").help("Accumulate a CRC32 over every emitted field").action(ArgAction::SetTrue))
        .arg(Arg::new("limit").long("limit").help("Stop after N rows").value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("fast-local").long("fast-local").help("Also count lines with the mmap path (feature: fast_local)").action(ArgAction::SetTrue))
        .get_matches();

    let path = matches.get_one::<PathBuf>("path").unwrap();
    let options = DsvOptions {
        delimiter: matches.get_one::<String>("delim").unwrap().clone(),
        header_rows: *matches.get_one::<usize>("header-rows").unwrap(),
        skip_footer_rows: *matches.get_one::<usize>("skip-footer").unwrap(),
        chunk_size: *matches.get_one::<usize>("chunk-size").unwrap(),
        ..Default::default()
    };
    let limit = matches.get_one::<u64>("limit").copied();
    let verify = matches.get_flag("verify");

    #[cfg(feature = "fast_local")]
    if matches.get_flag("fast-local") {
        let start = Instant::now();
        let lines = dsv_ingest::fast_line_count(path)?;
        println!(
            "source={} lines={} elapsed={:.3}s (fast_local)",
            path.display(),
            lines,
            start.elapsed().as_secs_f64()
        );
    }

    let start = Instant::now();
    let mut model = if matches.get_flag("csv") {
        let (reader, _meta) = dsv_ingest::reader_from_path(path).await?;
        StreamingTabularModel::from_csv_reader(reader, &options)?
    } else {
        StreamingTabularModel::open(path, &options).await?
    };

    let mut crc = Crc32::new();
    let mut rows: u64 = 0;
    let mut max_resident = 0usize;
    {
        let mut traversal = model.traverse()?;
        while let Some(row) = traversal.next_row().await? {
            rows += 1;
            max_resident = max_resident.max(traversal.model().resident_len());
            if verify {
                // fields separated by '\x1f' (unit separator), rows by '\x1e'
                for (fi, field) in row.values().iter().enumerate() {
                    if fi > 0 {
                        crc.update(&[0x1f]);
                    }
                    crc.update(field.as_bytes());
                }
                crc.update(&[0x1e]);
            }
            if limit.is_some_and(|lim| rows >= lim) {
                break;
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    let rps = (rows as f64) / elapsed;
    let columns = model.column_names()?;
    println!(
        "source={} rows={} columns={:?} max_resident={}\nelapsed={:.1}s rows/sec={:.0}",
        path.display(),
        rows,
        columns,
        max_resident,
        elapsed,
        rps
    );
    if verify {
        println!("crc=0x{:08x}", crc.finalize());
    }
    Ok(())
}
