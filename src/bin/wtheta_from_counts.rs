use clap::{Arg, Command};

use std::fs::File;

use anyhow::Result;

use survey_catalog_tools::MeasuredWTheta;

fn main() -> Result<()> {
    env_logger::init();
    let matches = Command::new("wtheta_from_counts")
        .about("turn DD/DR/RD/RR pair counts into a Landy-Szalay w(theta) with Poisson errors")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .takes_value(true)
                .value_name("json counts")
                .required(true)
                .help("pair counts file"),
        )
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .takes_value(true)
                .value_name("name")
                .default_value("wtheta")
                .help("name of the output function"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("out")
                .takes_value(true)
                .value_name("json function")
                .required(true)
                .help("estimated correlation function"),
        )
        .get_matches();

    let counts = MeasuredWTheta::load_json(matches.value_of("input").unwrap())?;
    let function = counts.correlation_function(matches.value_of("name").unwrap())?;

    for i in 0..function.len() {
        let (theta, w, error) = function.bin(i);
        println!("{} {} {}", theta, w, error);
    }

    let outfile = File::create(matches.value_of("outfile").unwrap())?;
    serde_json::to_writer(outfile, &function)?;
    Ok(())
}
