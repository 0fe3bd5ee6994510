use dsv_ingest::{DsvOptions, StreamingTabularModel};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = Path::new("./data/sample.csv.gz");
    let options = DsvOptions {
        header_rows: 2,
        skip_footer_rows: 1,
        ..Default::default()
    };
    let mut model = StreamingTabularModel::open(path, &options).await?;

    let names = model.header().await?.to_vec();
    println!("columns: {names:?}");

    let sku = model.column_index("sku")?;
    while let Some(row) = model.next_row().await? {
        let _sku = row.get(sku).unwrap_or("");
    }
    println!("rows: {}", model.rows_emitted());
    Ok(())
}
