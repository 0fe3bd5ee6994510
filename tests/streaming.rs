use dsv_ingest::{DataType, DsvError, DsvOptions, ModelState, Row, StreamingTabularModel};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::io::{self, Cursor};

fn row(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn text_model(text: &str, options: &DsvOptions) -> anyhow::Result<StreamingTabularModel> {
    Ok(StreamingTabularModel::from_reader(Cursor::new(text.to_string().into_bytes()), options)?)
}

async fn drain(model: &mut StreamingTabularModel) -> anyhow::Result<Vec<Row>> {
    let mut out = Vec::new();
    while let Some(r) = model.next_row().await? {
        out.push(r);
    }
    Ok(out)
}

#[tokio::test]
async fn widens_and_pads_end_to_end() -> anyhow::Result<()> {
    let options = DsvOptions {
        skip_empty_rows: false,
        ..Default::default()
    };
    let mut model = text_model("A,B\n1,2,3\n4\n", &options)?;
    let rows = drain(&mut model).await?;

    assert_eq!(model.column_names()?, row(&["A", "B", "column_2"]).as_slice());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].values(), row(&["1", "2", "3"]).as_slice());
    assert_eq!(rows[1].values(), row(&["4", "", ""]).as_slice());
    for r in &rows {
        assert_eq!(r.len(), r.schema().len());
    }
    Ok(())
}

#[tokio::test]
async fn rows_keep_the_schema_they_were_emitted_under() -> anyhow::Result<()> {
    let mut model = text_model("a,b\n1,2\n3,4,5\n", &DsvOptions::default())?;
    let first = model.next_record().await?.unwrap();
    let second = model.next_record().await?.unwrap();
    assert_eq!(first.len(), 2);
    assert!(!first.contains_key("column_2"));
    assert_eq!(second.get("column_2").map(String::as_str), Some("5"));
    Ok(())
}

#[tokio::test]
async fn schema_is_non_decreasing() -> anyhow::Result<()> {
    let text = "h\n1\n1,2,3\n1,2\n1,2,3,4,5\n1\n";
    let mut model = text_model(text, &DsvOptions::default())?;
    let mut last = 0;
    while let Some(r) = model.next_row().await? {
        assert_eq!(r.len(), r.schema().len());
        assert!(r.len() >= last);
        last = r.len();
    }
    assert_eq!(model.column_count()?, 5);
    Ok(())
}

#[tokio::test]
async fn no_header_synthesizes_names_from_first_row() -> anyhow::Result<()> {
    let options = DsvOptions {
        header_rows: 0,
        ..Default::default()
    };
    let mut model = text_model("\nJohn,30,NYC\nJane,25\n", &options)?;
    assert_eq!(model.header().await?, row(&["column_0", "column_1", "column_2"]).as_slice());
    let rows = drain(&mut model).await?;
    assert_eq!(rows[1].values(), row(&["Jane", "25", ""]).as_slice());
    Ok(())
}

#[tokio::test]
async fn multi_row_header_merges() -> anyhow::Result<()> {
    let options = DsvOptions {
        header_rows: 2,
        ..Default::default()
    };
    let mut model = text_model("Name,City\n,(Town)\nAnn,Oslo\n", &options)?;
    assert_eq!(model.header().await?, row(&["Name", "City_(Town)"]).as_slice());
    assert_eq!(model.header_data().len(), 2);
    let rec = model.next_record().await?.unwrap();
    assert_eq!(rec["City_(Town)"], "Oslo");
    Ok(())
}

#[tokio::test]
async fn blank_header_cell_gets_placeholder() -> anyhow::Result<()> {
    let mut model = text_model("Name,,City\nx,y,z\n", &DsvOptions::default())?;
    assert_eq!(model.header().await?, row(&["Name", "column_1", "City"]).as_slice());
    Ok(())
}

#[tokio::test]
async fn footer_rows_are_withheld_regardless_of_chunk_size() -> anyhow::Result<()> {
    for chunk_size in [100, 101, 1000] {
        let options = DsvOptions {
            header_rows: 0,
            skip_footer_rows: 2,
            chunk_size,
            ..Default::default()
        };
        let mut model = text_model("R1\nR2\nR3\nR4\n", &options)?;
        let rows: Vec<String> = drain(&mut model)
            .await?
            .into_iter()
            .map(|r| r.values()[0].clone())
            .collect();
        assert_eq!(rows, row(&["R1", "R2"]));
    }
    Ok(())
}

#[tokio::test]
async fn skip_header_rows_happen_before_header_resolution() -> anyhow::Result<()> {
    let options = DsvOptions {
        skip_header_rows: 2,
        skip_footer_rows: 1,
        ..Default::default()
    };
    let text = "Report\ngenerated today\nid,name\n1,a\n2,b\nTotal: 2\n";
    let mut model = text_model(text, &options)?;
    assert_eq!(model.header().await?, row(&["id", "name"]).as_slice());
    let ids: Vec<String> = drain(&mut model)
        .await?
        .iter()
        .map(|r| r.values()[0].clone())
        .collect();
    assert_eq!(ids, row(&["1", "2"]));
    Ok(())
}

#[tokio::test]
async fn blank_rows_follow_the_option() -> anyhow::Result<()> {
    let text = "a,b\n1,2\n , \n\n3,4\n";
    let mut skipping = text_model(text, &DsvOptions::default())?;
    assert_eq!(drain(&mut skipping).await?.len(), 2);

    let keep = DsvOptions {
        skip_empty_rows: false,
        ..Default::default()
    };
    let mut keeping = text_model(text, &keep)?;
    let rows = drain(&mut keeping).await?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2].values(), row(&["", ""]).as_slice());
    Ok(())
}

#[tokio::test]
async fn buffer_stays_bounded_on_large_input() -> anyhow::Result<()> {
    let total = 25_000usize;
    for (chunk_size, footer) in [(100usize, 0usize), (128, 7), (100, 250)] {
        let rows = (0..total).map(|i| {
            let width = 1 + i % 4;
            Ok::<_, io::Error>((0..width).map(|c| format!("{i}.{c}")).collect::<Vec<_>>())
        });
        let options = DsvOptions {
            header_rows: 0,
            skip_footer_rows: footer,
            chunk_size,
            ..Default::default()
        };
        let mut model = StreamingTabularModel::new(stream::iter(rows).boxed(), &options)?;
        let bound = chunk_size.max(footer + 1);

        let mut seen = 0usize;
        let mut width = 0usize;
        assert_eq!(model.resident_bound(), bound);
        // mix read-ahead with plain iteration
        assert!(model.buffered_row(0).await.is_ok());
        assert!(model.buffered_len() <= chunk_size);
        assert!(model.resident_len() <= bound);
        while let Some(r) = model.next_row().await? {
            assert_eq!(r.values()[0], format!("{seen}.0"));
            assert!(model.resident_len() <= bound);
            assert!(model.withheld_len() <= footer);
            if seen % 997 == 0 {
                model.buffered_column_values("column_0").await?;
                assert!(model.resident_len() <= bound);
            }
            assert!(r.len() >= width);
            width = r.len();
            seen += 1;
        }
        assert_eq!(seen, total - footer);
    }
    Ok(())
}

#[tokio::test]
async fn read_ahead_shares_the_bound_with_a_large_footer() -> anyhow::Result<()> {
    let rows = (0..1000).map(|i| Ok::<_, io::Error>(vec![format!("r{i}")]));
    let options = DsvOptions {
        header_rows: 0,
        skip_footer_rows: 250,
        chunk_size: 100,
        ..Default::default()
    };
    let mut model = StreamingTabularModel::new(stream::iter(rows).boxed(), &options)?;
    assert_eq!(model.buffered_row(0).await?.values(), row(&["r0"]).as_slice());
    assert_eq!(model.withheld_len(), 250);
    assert!(model.resident_len() <= 251);

    let mut max_resident = 0;
    let mut count = 0;
    while let Some(r) = model.next_row().await? {
        assert_eq!(r.values()[0], format!("r{count}"));
        max_resident = max_resident.max(model.resident_len());
        count += 1;
    }
    assert_eq!(count, 750);
    assert!(max_resident <= 251, "resident rows peaked at {max_resident}");
    Ok(())
}

#[tokio::test]
async fn exhausted_model_yields_nothing_more() -> anyhow::Result<()> {
    let mut model = text_model("a\n1\n", &DsvOptions::default())?;
    assert_eq!(drain(&mut model).await?.len(), 1);
    assert_eq!(model.state(), ModelState::Exhausted);
    assert!(model.next_row().await?.is_none());

    let mut traversal = model.traverse()?;
    assert!(traversal.next_tuple().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn one_traversal_at_a_time() -> anyhow::Result<()> {
    let mut model = text_model("a,b\n1,2\n3,4\n5,6\n", &DsvOptions::default())?;
    {
        let mut t = model.traverse()?;
        let first = t.next_tuple().await?.unwrap();
        assert_eq!(&*first, row(&["1", "2"]).as_slice());
    }
    // released on drop; the cursor is shared so we continue where we left off
    let mut t = model.traverse()?;
    let rec = t.next_record().await?.unwrap();
    assert_eq!(rec["a"], "3");
    std::mem::forget(t);

    // a leaked traversal still counts as active
    assert!(matches!(model.traverse(), Err(DsvError::State(_))));
    Ok(())
}

#[tokio::test]
async fn schema_before_header_is_a_state_error() -> anyhow::Result<()> {
    let mut model = text_model("a,b\n1,2\n", &DsvOptions::default())?;
    assert_eq!(model.state(), ModelState::Unstarted);
    assert!(matches!(model.schema(), Err(DsvError::State(_))));
    assert!(matches!(model.column_index("a"), Err(DsvError::State(_))));
    model.header().await?;
    assert_eq!(model.state(), ModelState::Streaming);
    assert_eq!(model.column_index("b")?, 1);
    assert!(matches!(model.column_index("zzz"), Err(DsvError::UnknownColumn(_))));
    Ok(())
}

#[tokio::test]
async fn invalid_configuration_fails_fast() {
    let cases = [
        DsvOptions {
            chunk_size: 10,
            ..Default::default()
        },
        DsvOptions {
            delimiter: String::new(),
            ..Default::default()
        },
        DsvOptions {
            header_rows: 1,
            column_name_rows: Some(2),
            ..Default::default()
        },
        DsvOptions {
            header_rows: 2,
            column_name_rows: Some(0),
            ..Default::default()
        },
        DsvOptions {
            delimiter: "'".into(),
            quote: Some('\''),
            ..Default::default()
        },
    ];
    for options in cases {
        let res = StreamingTabularModel::from_rows(vec![], &options);
        assert!(matches!(res, Err(DsvError::Config(_))), "{options:?}");
    }
}

#[tokio::test]
async fn buffered_access_does_not_lose_rows() -> anyhow::Result<()> {
    let mut model = text_model("n,kind\n1,x\n2,y\n3,z\n", &DsvOptions::default())?;
    assert_eq!(model.buffered_cell("kind", 1).await?, "y");
    assert_eq!(model.buffered_record(2).await?["n"], "3");
    assert!(matches!(
        model.buffered_row(3).await,
        Err(DsvError::RowOutOfRange { index: 3, len: 3 })
    ));
    assert_eq!(model.buffered_column_values("n").await?, row(&["1", "2", "3"]));
    assert_eq!(model.column_type("n").await?, DataType::Integer);
    assert_eq!(model.column_type("kind").await?, DataType::String);

    let rows = drain(&mut model).await?;
    assert_eq!(rows.len(), 3);
    assert_eq!(model.rows_emitted(), 3);
    Ok(())
}

#[tokio::test]
async fn into_stream_projects_rows() -> anyhow::Result<()> {
    let model = text_model("a;b\n1;2\n3;4\n", &DsvOptions {
        delimiter: ";".into(),
        ..Default::default()
    })?;
    let rows: Vec<Row> = model.into_stream().try_collect().await?;
    let tuples: Vec<Box<[String]>> = rows.into_iter().map(Row::into_tuple).collect();
    assert_eq!(tuples.len(), 2);
    assert_eq!(&*tuples[1], row(&["3", "4"]).as_slice());
    Ok(())
}

#[tokio::test]
async fn csv_reader_handles_multiline_quotes() -> anyhow::Result<()> {
    let text = "id,note\n1,\"two\nlines\"\n2,plain\n";
    let mut model =
        StreamingTabularModel::from_csv_reader(Cursor::new(text.as_bytes().to_vec()), &DsvOptions::default())?;
    let rows = drain(&mut model).await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_by_name("note"), Some("two\nlines"));
    Ok(())
}

#[tokio::test]
async fn source_errors_propagate() -> anyhow::Result<()> {
    let items: Vec<io::Result<Vec<String>>> = vec![
        Ok(row(&["a"])),
        Ok(row(&["1"])),
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
    ];
    let mut model = StreamingTabularModel::new(stream::iter(items).boxed(), &DsvOptions::default())?;
    assert_eq!(model.next_row().await?.unwrap().values(), row(&["1"]).as_slice());
    match model.next_row().await {
        Err(DsvError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected io error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn rows_read_before_a_bad_record_are_still_emitted() -> anyhow::Result<()> {
    let items: Vec<io::Result<Vec<String>>> = vec![
        Ok(row(&["r1"])),
        Ok(row(&["r2"])),
        Err(io::Error::new(io::ErrorKind::InvalidData, "bad record")),
        Ok(row(&["r3"])),
    ];
    let options = DsvOptions {
        header_rows: 0,
        ..Default::default()
    };
    let mut model = StreamingTabularModel::new(stream::iter(items).boxed(), &options)?;
    assert_eq!(model.next_row().await?.unwrap().values(), row(&["r1"]).as_slice());
    assert_eq!(model.next_row().await?.unwrap().values(), row(&["r2"]).as_slice());
    assert!(matches!(model.next_row().await, Err(DsvError::Io(e)) if e.kind() == io::ErrorKind::InvalidData));
    assert_eq!(model.next_row().await?.unwrap().values(), row(&["r3"]).as_slice());
    assert!(model.next_row().await?.is_none());
    assert_eq!(model.rows_emitted(), 3);
    Ok(())
}

#[tokio::test]
async fn blank_first_line_is_one_empty_column() -> anyhow::Result<()> {
    let options = DsvOptions {
        header_rows: 0,
        skip_empty_rows: false,
        ..Default::default()
    };
    let mut model = text_model("
x,y
", &options)?;
    assert_eq!(model.header().await?, row(&["column_0"]).as_slice());
    let rows = drain(&mut model).await?;
    assert_eq!(rows[0].values(), row(&[""]).as_slice());
    assert_eq!(rows[1].values(), row(&["x", "y"]).as_slice());
    assert_eq!(model.column_names()?, row(&["column_0", "column_1"]).as_slice());
    Ok(())
}
