use clap::{Arg, ArgAction, Command};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("header_rows")
                .long("header-rows")
                .help("Header lines to emit; the second and later ones hold unit labels")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            Arg::new("footer_rows")
                .long("footer-rows")
                .help("Trailing summary lines after the data")
                .value_parser(clap::value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("ragged")
                .long("ragged")
                .help("Every 7th row is short and every 11th row has an extra field")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cols")
                .long("cols")
                .value_parser(clap::value_parser!(usize))
                .default_value("3"),
        )
        .arg(Arg::new("delim").long("delim").default_value(","))
        .get_matches();

    let rows: u64 = *matches.get_one("rows").unwrap();
    let header_rows: usize = *matches.get_one("header_rows").unwrap();
    let footer_rows: usize = *matches.get_one("footer_rows").unwrap();
    let ragged = matches.get_flag("ragged");
    let cols: usize = *matches.get_one::<usize>("cols").unwrap();
    let delim = matches.get_one::<String>("delim").unwrap();

    let mut out = io::BufWriter::new(io::stdout().lock());

    for h in 0..header_rows {
        let fields: Vec<String> = (0..cols)
            .map(|c| match (h, c) {
                (0, 0) => "sku".to_string(),
                (0, c) => format!("col{c}"),
                (_, 0) => String::new(),
                (h, c) => format!("unit{h}_{c}"),
            })
            .collect();
        writeln!(&mut out, "{}", fields.join(delim))?;
    }

    // Deterministic data: sku, v1_i, v2_i, ...
    for i in 0..rows {
        let width = if ragged && i % 7 == 6 {
            1
        } else if ragged && i % 11 == 10 {
            cols + 1
        } else {
            cols
        };
        write!(&mut out, "SKU{:010}", i)?;
        for c in 1..width {
            write!(&mut out, "{}v{}_{}", delim, c, i)?;
        }
        writeln!(&mut out)?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    for f in 0..footer_rows {
        writeln!(&mut out, "# footer {f}: {rows} rows")?;
    }

    out.flush()?;
    Ok(())
}
