use clap::{Arg, Command};

use anyhow::{ensure, Result};

use rand::{rngs::StdRng, SeedableRng};

use survey_catalog_tools::{random_catalog, PixelMask};

fn range_of(matches: &clap::ArgMatches, name: &str) -> Result<(f64, f64)> {
    let values: Vec<f64> = matches
        .values_of(name)
        .unwrap()
        .map(|x| x.trim().parse::<f64>())
        .collect::<Result<_, _>>()?;
    ensure!(values.len() == 2, "--{} wants exactly lo,hi", name);
    Ok((values[0], values[1]))
}

fn main() -> Result<()> {
    env_logger::init();
    let matches = Command::new("random_catalog")
        .about("draw a uniform-on-the-sphere random catalog, optionally annotated with masks")
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .takes_value(true)
                .value_name("points")
                .required(true)
                .help("number of random points"),
        )
        .arg(
            Arg::new("ra_range")
                .long("ra-range")
                .takes_value(true)
                .value_name("lo,hi")
                .required(true)
                .use_delimiter(true)
                .value_delimiter(',')
                .allow_hyphen_values(true)
                .help("right ascension window in degrees"),
        )
        .arg(
            Arg::new("dec_range")
                .long("dec-range")
                .takes_value(true)
                .value_name("lo,hi")
                .required(true)
                .use_delimiter(true)
                .value_delimiter(',')
                .allow_hyphen_values(true)
                .help("declination window in degrees"),
        )
        .arg(
            Arg::new("masks")
                .short('m')
                .long("masks")
                .takes_value(true)
                .value_name("json masks")
                .required(false)
                .use_delimiter(true)
                .value_delimiter(',')
                .help("pixel masks to sample at every point"),
        )
        .arg(
            Arg::new("names")
                .long("names")
                .takes_value(true)
                .value_name("columns")
                .required(false)
                .use_delimiter(true)
                .value_delimiter(',')
                .help("one column name per mask"),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .takes_value(true)
                .value_name("seed")
                .default_value("0")
                .help("rng seed"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("out")
                .takes_value(true)
                .value_name("csv catalog")
                .required(true)
                .help("random catalog"),
        )
        .get_matches();

    let n = matches.value_of("count").unwrap().parse::<usize>()?;
    let ra_range = range_of(&matches, "ra_range")?;
    let dec_range = range_of(&matches, "dec_range")?;
    let seed = matches.value_of("seed").unwrap().parse::<u64>()?;

    let masks: Vec<PixelMask> = match matches.values_of("masks") {
        Some(paths) => paths
            .map(|p| PixelMask::read_json(p).map_err(Into::into))
            .collect::<Result<_>>()?,
        None => Vec::new(),
    };
    let names: Vec<String> = matches
        .values_of("names")
        .map(|v| v.map(str::to_owned).collect())
        .unwrap_or_default();

    let mut rng = StdRng::seed_from_u64(seed);
    let table = random_catalog(n, ra_range, dec_range, &masks, &names, &mut rng)?;
    table.write_csv(matches.value_of("outfile").unwrap())?;
    Ok(())
}
