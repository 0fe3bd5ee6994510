use dsv_ingest::text_file::{self, LineOptions};
use dsv_ingest::{DsvError, DsvOptions, StreamingTabularModel, TabularDataModel};
use std::{fs::File, io::Write, path::PathBuf, process::Command};

#[tokio::test]
async fn streams_gzip_with_ragged_rows() -> anyhow::Result<()> {
    // Create a CSV with a two-line header, a footer and a ragged row
    let dir = tempfile::tempdir()?;
    let csv_path = dir.path().join("tiny.csv");
    let mut f = File::create(&csv_path)?;
    writeln!(f, "sku,col1")?;
    writeln!(f, ",units")?;
    for i in 0..100_000 {
        if i == 50_000 {
            writeln!(f, "SKU{i:06},{i},extra")?;
        } else {
            writeln!(f, "SKU{i:06},{i}")?;
        }
    }
    writeln!(f, "total,100000")?;

    // gzip it (use system gzip for speed)
    let gz_path: PathBuf = dir.path().join("tiny.csv.gz");
    let status = Command::new("bash")
        .arg("-lc")
        .arg(format!(
            "gzip -c {} > {}",
            csv_path.display(),
            gz_path.display()
        ))
        .status()?;
    assert!(status.success());

    let options = DsvOptions {
        header_rows: 2,
        skip_footer_rows: 1,
        chunk_size: 500,
        ..Default::default()
    };
    let mut model = StreamingTabularModel::open(&gz_path, &options).await?;
    assert_eq!(model.header().await?, ["sku", "col1_units"]);

    let mut rows = 0usize;
    let mut last = None;
    while let Some(row) = model.next_row().await? {
        assert!(model.buffered_len() <= 500);
        if rows < 50_000 {
            assert_eq!(row.len(), 2);
        } else {
            assert_eq!(row.len(), 3);
        }
        rows += 1;
        last = Some(row);
    }
    assert_eq!(rows, 100_000);
    assert_eq!(model.column_names()?, ["sku", "col1_units", "column_2"]);
    let last = last.unwrap();
    assert_eq!(last.values(), ["SKU099999", "99999", ""]);
    Ok(())
}

#[tokio::test]
async fn text_file_helpers() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lines.txt");
    std::fs::write(&path, "header\n  a  \nb\nc\nfooter\n")?;

    assert_eq!(text_file::line_count(&path).await?, 5);

    let preview = text_file::preview(&path, 2, LineOptions::default()).await?;
    assert_eq!(preview, ["header", "a"]);

    let raw = text_file::preview(
        &path,
        10,
        LineOptions {
            strip: false,
            skip_header_rows: 1,
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(raw, ["  a  ", "b", "c", "footer"]);

    let body = text_file::load(
        &path,
        LineOptions {
            skip_header_rows: 1,
            skip_footer_rows: 1,
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(body, ["a", "b", "c"]);

    let all_footer = text_file::load(
        &path,
        LineOptions {
            skip_footer_rows: 9,
            ..Default::default()
        },
    )
    .await?;
    assert!(all_footer.is_empty());

    assert!(matches!(
        text_file::preview(&path, 0, LineOptions::default()).await,
        Err(DsvError::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn materialized_load_from_tsv() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("people.tsv");
    std::fs::write(&path, "name\tage\nann\t31\nbo\t\n")?;

    let model = TabularDataModel::load(&path, &DsvOptions::tsv()).await?;
    assert_eq!(model.column_names(), ["name", "age"]);
    assert_eq!(model.cell_by_name(1, "age")?, "");
    Ok(())
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let res = StreamingTabularModel::open("/definitely/not/here.csv".as_ref(), &DsvOptions::default()).await;
    assert!(matches!(res, Err(DsvError::Io(_))));
}

#[cfg(feature = "fast_local")]
#[test]
fn fast_line_count_matches_streaming_count() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("count.csv");
    let mut f = File::create(&path)?;
    for i in 0..10_001 {
        write!(f, "{i}")?;
        if i < 10_000 {
            writeln!(f)?;
        }
    }
    drop(f);
    assert_eq!(dsv_ingest::fast_line_count(&path)?, 10_001);
    Ok(())
}
