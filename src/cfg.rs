use std::fs::File;
use std::path::Path;

use serde::{
    Serialize
    , Deserialize
};

use crate::error::CatalogResult;


#[derive(Clone, Serialize, Deserialize)]
pub struct ReweightCfg{
    pub reference: CatalogCfg
    , pub target: CatalogCfg
    , pub output: String
    , pub weight_column: String
    , pub k_neighbors: usize
    , pub concurrency: Option<usize>
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CatalogCfg{
    pub path: String
    , pub feature_columns: Vec<String>
}

impl ReweightCfg {
    pub fn read_yaml<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let file = File::open(path.as_ref())?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn write_yaml<P: AsRef<Path>>(&self, path: P) -> CatalogResult<()> {
        let mut file = File::create(path.as_ref())?;
        serde_yaml::to_writer(&mut file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        let cfg = ReweightCfg {
            reference: CatalogCfg {
                path: "ref.csv".to_string(),
                feature_columns: vec!["mag_i".to_string()],
            },
            target: CatalogCfg {
                path: "tgt.csv".to_string(),
                feature_columns: vec!["mag_i".to_string()],
            },
            output: "out.csv".to_string(),
            weight_column: "w".to_string(),
            k_neighbors: 4,
            concurrency: Some(2),
        };
        cfg.write_yaml(&path).unwrap();

        let back = ReweightCfg::read_yaml(&path).unwrap();
        assert_eq!(back.reference.path, "ref.csv");
        assert_eq!(back.target.feature_columns, ["mag_i"]);
        assert_eq!(back.k_neighbors, 4);
        assert_eq!(back.concurrency, Some(2));
    }
}
