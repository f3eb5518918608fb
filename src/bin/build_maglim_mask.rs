extern crate survey_catalog_tools as sct;

use clap::{
    App
    , Arg
};

use anyhow::{
    ensure
    , Result
};

use log::info;

use sct::{
    max_map
    , Table
};

struct FluxCut {
    col: String,
    err_col: String,
    ratio: f64,
}

struct UpperCut {
    col: String,
    err_col: String,
    factor: f64,
    limit: f64,
}

// keep rows with col > ratio * err_col
fn parse_flux_cut(text: &str) -> Result<FluxCut> {
    let parts: Vec<&str> = text.split(':').collect();
    ensure!(parts.len() == 3, "flux cut {:?} is not col:err_col:ratio", text);
    Ok(FluxCut {
        col: parts[0].to_owned(),
        err_col: parts[1].to_owned(),
        ratio: parts[2].parse()?,
    })
}

// keep rows with col + factor * err_col < limit
fn parse_upper_cut(text: &str) -> Result<UpperCut> {
    let parts: Vec<&str> = text.split(':').collect();
    ensure!(
        parts.len() == 4,
        "upper cut {:?} is not col:err_col:factor:limit",
        text
    );
    Ok(UpperCut {
        col: parts[0].to_owned(),
        err_col: parts[1].to_owned(),
        factor: parts[2].parse()?,
        limit: parts[3].parse()?,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let matches = App::new("build_maglim_mask")
        .about("build a per-pixel limiting-depth mask from the objects passing quality cuts")
        .arg(Arg::new("input")
            .short('i')
            .long("input")
            .takes_value(true)
            .value_name("csv catalog")
            .required(true)
            .help("object catalog")
        )
        .arg(Arg::new("nside")
            .short('n')
            .long("nside")
            .takes_value(true)
            .value_name("nside")
            .default_value("4096")
            .help("healpix nside, power of two")
        )
        .arg(Arg::new("ra")
            .long("ra")
            .takes_value(true)
            .value_name("column")
            .default_value("ra")
            .help("right ascension column, degrees")
        )
        .arg(Arg::new("dec")
            .long("dec")
            .takes_value(true)
            .value_name("column")
            .default_value("dec")
            .help("declination column, degrees")
        )
        .arg(Arg::new("value")
            .short('v')
            .long("value")
            .takes_value(true)
            .value_name("column")
            .required(true)
            .help("depth column, per pixel the maximum is kept")
        )
        .arg(Arg::new("flux_cut")
            .long("flux-cut")
            .takes_value(true)
            .value_name("col:err_col:ratio")
            .multiple_occurrences(true)
            .help("keep objects with col > ratio * err_col, repeatable")
        )
        .arg(Arg::new("upper_cut")
            .long("upper-cut")
            .takes_value(true)
            .value_name("col:err_col:factor:limit")
            .multiple_occurrences(true)
            .help("keep objects with col + factor * err_col < limit, repeatable")
        )
        .arg(Arg::new("outfile")
            .short('o')
            .long("out")
            .takes_value(true)
            .value_name("json mask")
            .required(true)
            .help("output pixel mask")
        )
        .get_matches();

    let mut table = Table::read_csv(matches.value_of("input").unwrap())?;
    let total = table.rows();
    let mut keep = vec![true; total];

    for raw in matches.values_of("flux_cut").into_iter().flatten() {
        let cut = parse_flux_cut(raw)?;
        let flux = table.numeric(&cut.col)?;
        let err = table.numeric(&cut.err_col)?;
        for ((k, &f), &e) in keep.iter_mut().zip(flux).zip(err) {
            *k = *k && f > cut.ratio * e;
        }
    }
    for raw in matches.values_of("upper_cut").into_iter().flatten() {
        let cut = parse_upper_cut(raw)?;
        let value = table.numeric(&cut.col)?;
        let err = table.numeric(&cut.err_col)?;
        for ((k, &v), &e) in keep.iter_mut().zip(value).zip(err) {
            *k = *k && v + cut.factor * e < cut.limit;
        }
    }

    let kept = keep.iter().filter(|&&k| k).count();
    info!("{} of {} objects pass the cuts", kept, total);
    ensure!(kept > 0, "no objects survive the cuts");
    table.retain_rows(&keep)?;

    let nside = matches.value_of("nside").unwrap().parse::<u32>()?;
    let mask = max_map(
        nside,
        table.numeric(matches.value_of("ra").unwrap())?,
        table.numeric(matches.value_of("dec").unwrap())?,
        table.numeric(matches.value_of("value").unwrap())?,
    )?;
    mask.write_json(matches.value_of("outfile").unwrap())?;
    Ok(())
}
