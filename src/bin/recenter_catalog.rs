use clap::{Arg, Command};

use anyhow::Result;

use survey_catalog_tools::Table;

fn main() -> Result<()> {
    env_logger::init();
    let matches = Command::new("recenter_catalog")
        .about("wrap coordinate columns from [0, 360) into (-180, 180]")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .takes_value(true)
                .value_name("csv catalog")
                .required(true)
                .help("catalog to recenter"),
        )
        .arg(
            Arg::new("columns")
                .short('c')
                .long("columns")
                .takes_value(true)
                .value_name("columns")
                .default_value("ra")
                .use_delimiter(true)
                .value_delimiter(',')
                .help("numeric columns to wrap"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("out")
                .takes_value(true)
                .value_name("csv catalog")
                .required(true)
                .help("recentered catalog"),
        )
        .get_matches();

    let columns: Vec<String> = matches
        .values_of("columns")
        .unwrap()
        .map(str::to_owned)
        .collect();

    let mut table = Table::read_csv(matches.value_of("input").unwrap())?;
    table.recenter(&columns)?;
    table.write_csv(matches.value_of("outfile").unwrap())?;
    Ok(())
}
