extern crate survey_catalog_tools as sct;

use clap::{
    App
    , Arg
    , ArgMatches
};

use anyhow::{
    anyhow
    , Context
    , Result
};

use log::info;

use sct::{
    compute_weights
    , CatalogCfg
    , ReweightCfg
    , Table
};

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("--{} is required when no --cfg is given", name))
}

fn main() -> Result<()> {
    env_logger::init();
    let matches = App::new("reweight_catalog")
        .about("weight a target catalog so its feature density matches a reference catalog")
        .arg(Arg::new("cfg")
            .short('c')
            .long("cfg")
            .takes_value(true)
            .value_name("yaml cfg")
            .required(false)
            .help("yaml config, replaces the flags below")
        )
        .arg(Arg::new("reference")
            .short('r')
            .long("reference")
            .takes_value(true)
            .value_name("csv catalog")
            .required(false)
            .help("reference catalog")
        )
        .arg(Arg::new("target")
            .short('t')
            .long("target")
            .takes_value(true)
            .value_name("csv catalog")
            .required(false)
            .help("catalog to weight")
        )
        .arg(Arg::new("features")
            .short('F')
            .long("features")
            .takes_value(true)
            .value_name("columns")
            .required(false)
            .use_delimiter(true)
            .value_delimiter(',')
            .help("feature columns, shared by both catalogs")
        )
        .arg(Arg::new("neighbors")
            .short('k')
            .long("neighbors")
            .takes_value(true)
            .value_name("k")
            .required(false)
            .help("number of nearest neighbors")
        )
        .arg(Arg::new("jobs")
            .short('j')
            .long("jobs")
            .takes_value(true)
            .value_name("workers")
            .required(false)
            .help("worker threads, default cores-1")
        )
        .arg(Arg::new("weight_column")
            .short('w')
            .long("weight-col")
            .takes_value(true)
            .value_name("name")
            .default_value("weight")
            .help("name of the appended weight column")
        )
        .arg(Arg::new("outfile")
            .short('o')
            .long("out")
            .takes_value(true)
            .value_name("csv catalog")
            .required(false)
            .help("weighted copy of the target")
        )
        .get_matches();

    let cfg: ReweightCfg = if let Some(fname) = matches.value_of("cfg") {
        ReweightCfg::read_yaml(fname).with_context(|| format!("reading {}", fname))?
    } else {
        let feature_columns: Vec<String> = matches
            .values_of("features")
            .ok_or_else(|| anyhow!("--features is required when no --cfg is given"))?
            .map(str::to_owned)
            .collect();
        ReweightCfg {
            reference: CatalogCfg {
                path: required(&matches, "reference")?.to_owned(),
                feature_columns: feature_columns.clone(),
            },
            target: CatalogCfg {
                path: required(&matches, "target")?.to_owned(),
                feature_columns,
            },
            output: required(&matches, "outfile")?.to_owned(),
            weight_column: matches.value_of("weight_column").unwrap().to_owned(),
            k_neighbors: required(&matches, "neighbors")?.parse::<usize>()?,
            concurrency: matches
                .value_of("jobs")
                .map(|x| x.parse::<usize>())
                .transpose()?,
        }
    };

    let reference = Table::read_csv(&cfg.reference.path)?;
    let mut target = Table::read_csv(&cfg.target.path)?;
    let ref_points = reference.points(&cfg.reference.feature_columns)?;
    let tgt_points = target.points(&cfg.target.feature_columns)?;
    info!(
        "matching {} target rows to {} reference rows over {} features, k={}",
        tgt_points.nrows(),
        ref_points.nrows(),
        tgt_points.ncols(),
        cfg.k_neighbors
    );

    let weights = compute_weights(
        ref_points.view(),
        tgt_points.view(),
        cfg.k_neighbors,
        cfg.concurrency,
    )?;

    target.push_numeric_column(&cfg.weight_column, weights)?;
    target.write_csv(&cfg.output)?;
    Ok(())
}
