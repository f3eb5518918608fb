extern crate survey_catalog_tools as sct;

use clap::{
    App
    , Arg
};

use anyhow::Result;

use sct::{
    append_mask_columns
    , AngularUnits
    , PixelMask
    , Table
};

fn main() -> Result<()> {
    env_logger::init();
    let matches = App::new("apply_mask")
        .about("sample pixel masks at every catalog position and append the values as columns")
        .arg(Arg::new("input")
            .short('i')
            .long("input")
            .takes_value(true)
            .value_name("csv catalog")
            .required(true)
            .help("catalog to annotate")
        )
        .arg(Arg::new("masks")
            .short('m')
            .long("masks")
            .takes_value(true)
            .value_name("json masks")
            .required(true)
            .use_delimiter(true)
            .value_delimiter(',')
            .help("pixel mask files")
        )
        .arg(Arg::new("names")
            .short('n')
            .long("names")
            .takes_value(true)
            .value_name("columns")
            .required(true)
            .use_delimiter(true)
            .value_delimiter(',')
            .help("one new column name per mask")
        )
        .arg(Arg::new("ra")
            .long("ra")
            .takes_value(true)
            .value_name("column")
            .default_value("ra")
            .help("right ascension column")
        )
        .arg(Arg::new("dec")
            .long("dec")
            .takes_value(true)
            .value_name("column")
            .default_value("dec")
            .help("declination column")
        )
        .arg(Arg::new("units")
            .short('u')
            .long("units")
            .takes_value(true)
            .value_name("units")
            .default_value("degrees")
            .help("coordinate units: degrees, radians or arcmin")
        )
        .arg(Arg::new("outfile")
            .short('o')
            .long("out")
            .takes_value(true)
            .value_name("csv catalog")
            .required(true)
            .help("annotated catalog")
        )
        .get_matches();

    let masks: Vec<PixelMask> = matches
        .values_of("masks")
        .unwrap()
        .map(|p| PixelMask::read_json(p).map_err(Into::into))
        .collect::<Result<_>>()?;
    let names: Vec<String> = matches
        .values_of("names")
        .unwrap()
        .map(str::to_owned)
        .collect();

    let units: AngularUnits = matches.value_of("units").unwrap().parse()?;
    let mut table = Table::read_csv(matches.value_of("input").unwrap())?;
    append_mask_columns(
        &mut table,
        &masks,
        &names,
        matches.value_of("ra").unwrap(),
        matches.value_of("dec").unwrap(),
        units,
    )?;
    table.write_csv(matches.value_of("outfile").unwrap())?;
    Ok(())
}
