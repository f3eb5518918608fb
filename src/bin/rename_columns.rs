use clap::{Arg, Command};

use anyhow::Result;

use survey_catalog_tools::Table;

fn main() -> Result<()> {
    env_logger::init();
    let matches = Command::new("rename_columns")
        .about("rename catalog columns, old and new names paired by position")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .takes_value(true)
                .value_name("csv catalog")
                .required(true)
                .help("catalog to rewrite"),
        )
        .arg(
            Arg::new("from")
                .short('f')
                .long("from")
                .takes_value(true)
                .value_name("columns")
                .required(true)
                .use_delimiter(true)
                .value_delimiter(',')
                .help("existing column names"),
        )
        .arg(
            Arg::new("to")
                .short('t')
                .long("to")
                .takes_value(true)
                .value_name("columns")
                .required(true)
                .use_delimiter(true)
                .value_delimiter(',')
                .help("replacement names, one per --from entry"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("out")
                .takes_value(true)
                .value_name("csv catalog")
                .required(true)
                .help("rewritten catalog"),
        )
        .get_matches();

    let from: Vec<String> = matches
        .values_of("from")
        .unwrap()
        .map(str::to_owned)
        .collect();
    let to: Vec<String> = matches
        .values_of("to")
        .unwrap()
        .map(str::to_owned)
        .collect();

    let mut table = Table::read_csv(matches.value_of("input").unwrap())?;
    table.rename_columns(&from, &to)?;
    table.write_csv(matches.value_of("outfile").unwrap())?;
    Ok(())
}
