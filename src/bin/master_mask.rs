use clap::{Arg, Command};

use anyhow::Result;

use survey_catalog_tools::{master_mask, parse_selections, PixelMask};

fn main() -> Result<()> {
    env_logger::init();
    let matches = Command::new("master_mask")
        .about("combine value masks into a binary footprint, one selection per mask")
        .arg(
            Arg::new("masks")
                .short('m')
                .long("masks")
                .takes_value(true)
                .value_name("json masks")
                .required(true)
                .use_delimiter(true)
                .value_delimiter(',')
                .help("pixel mask files, all at one nside"),
        )
        .arg(
            Arg::new("selections")
                .short('s')
                .long("selections")
                .takes_value(true)
                .value_name("list")
                .required(true)
                .allow_hyphen_values(true)
                .help("per-mask intervals like '21,inf;0.4~,inf', `~` closes a bound"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("out")
                .takes_value(true)
                .value_name("json mask")
                .required(true)
                .help("binary master mask"),
        )
        .get_matches();

    let selections = parse_selections(matches.value_of("selections").unwrap())?;
    let masks: Vec<PixelMask> = matches
        .values_of("masks")
        .unwrap()
        .map(|p| PixelMask::read_json(p).map_err(Into::into))
        .collect::<Result<_>>()?;

    let master = master_mask(&selections, &masks)?;
    master.write_json(matches.value_of("outfile").unwrap())?;
    Ok(())
}
