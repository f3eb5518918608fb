pub mod cfg;
pub mod error;
pub mod kdtree;
pub mod mask;
pub mod randcat;
pub mod reweight;
pub mod selection;
pub mod table;
pub mod wtheta;

pub use crate::{
    cfg::{
        CatalogCfg
        , ReweightCfg
    }
    , error::{
        CatalogError
        , CatalogResult
    }
    , kdtree::KdTree
    , mask::{
        append_mask_columns
        , master_mask
        , max_map
        , pixel_at
        , AngularUnits
        , PixelMask
    }
    , randcat::{
        random_catalog
        , uniform_radec
    }
    , reweight::{
        compute_weights
        , default_concurrency
    }
    , selection::{
        parse_selections
        , Bound
        , Selection
    }
    , table::{
        Column
        , Table
    }
    , wtheta::{
        CorrelationFunction
        , DataW
        , MeasuredWTheta
        , TheoMagW
    }
};
