use anyhow::Result;

use survey_catalog_tools::{
    CatalogCfg
    , ReweightCfg
};


pub fn main() -> Result<()> {
    let cfg = ReweightCfg {
        reference: CatalogCfg {
            path: "spectroscopic.csv".to_string(),
            feature_columns: vec!["mag_i".to_string(), "mag_z".to_string()],
        },
        target: CatalogCfg {
            path: "photometric.csv".to_string(),
            feature_columns: vec!["mag_i".to_string(), "mag_z".to_string()],
        },
        output: "photometric_weighted.csv".to_string(),
        weight_column: "weight".to_string(),
        k_neighbors: 16,
        concurrency: None,
    };

    cfg.write_yaml("reweight.yaml")?;
    Ok(())
}
