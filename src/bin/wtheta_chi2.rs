use clap::{Arg, Command};

use anyhow::Result;

use log::warn;

use survey_catalog_tools::{DataW, TheoMagW};

fn main() -> Result<()> {
    env_logger::init();
    let matches = Command::new("wtheta_chi2")
        .about("chi-square of a scaled theory w(theta) against an Athena measurement")
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .takes_value(true)
                .value_name("athena file")
                .required(true)
                .help("measured angle/w/error columns"),
        )
        .arg(
            Arg::new("covariance")
                .short('c')
                .long("covariance")
                .takes_value(true)
                .value_name("athena cov")
                .required(false)
                .help("covariance block, defaults to diag(error^2)"),
        )
        .arg(
            Arg::new("theory")
                .short('t')
                .long("theory")
                .takes_value(true)
                .value_name("theory file")
                .required(true)
                .help("angle/w0 columns on the same binning"),
        )
        .arg(
            Arg::new("bias")
                .short('b')
                .long("bias")
                .takes_value(true)
                .value_name("bias")
                .default_value("1.0")
                .allow_hyphen_values(true)
                .help("galaxy bias factor"),
        )
        .arg(
            Arg::new("alpha")
                .short('a')
                .long("alpha")
                .takes_value(true)
                .value_name("alpha")
                .default_value("1.0")
                .allow_hyphen_values(true)
                .help("magnification slope factor"),
        )
        .get_matches();

    let bias = matches.value_of("bias").unwrap().parse::<f64>()?;
    let alpha = matches.value_of("alpha").unwrap().parse::<f64>()?;

    let mut data = DataW::new("data");
    data.read_athena_function(matches.value_of("data").unwrap())?;
    match matches.value_of("covariance") {
        Some(path) => data.read_athena_covariance(path)?,
        None => data.set_diagonal_covariance()?,
    }

    let mut theory = TheoMagW::new("theory", bias, alpha);
    theory.read_function(matches.value_of("theory").unwrap())?;

    if data.function.len() == theory.function.len() {
        let drift = data
            .function
            .angle
            .iter()
            .zip(theory.function.angle.iter())
            .map(|(&a, &b)| (a - b).abs())
            .fold(0.0, f64::max);
        if drift > 1e-6 {
            warn!("data and theory angular grids differ by up to {}", drift);
        }
    }

    let chi2 = data.chi2(&theory.function.w)?;
    println!("chi2 = {}", chi2);
    println!("chi2/nbin = {}", chi2 / data.function.len() as f64);
    Ok(())
}
