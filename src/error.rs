use thiserror::Error;

/// Error type shared by every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A precondition on the inputs was violated (empty sets, mismatched
    /// dimensionality, neighbor count out of range, bad angular ranges).
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// No target point had any reference neighbor within its own radius,
    /// so the weight normalization is undefined.
    #[error("degenerate distribution: zero reference neighbors over the whole target set")]
    DegenerateDistribution,

    /// The spatial index could not be built over the given points.
    #[error("index build failed: {reason}")]
    IndexBuild { reason: String },

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("column '{name}' appears more than once")]
    DuplicateColumn { name: String },

    #[error("no column named '{name}'")]
    NoSuchColumn { name: String },

    #[error("column '{name}' is not a {expected} column")]
    ColumnKind { name: String, expected: &'static str },

    #[error("column '{name}' has {len} entries but the table has {rows} rows")]
    ColumnLength {
        name: String,
        len: usize,
        rows: usize,
    },

    /// The interval-selection string did not match the grammar.
    #[error("selection syntax: {0}")]
    Selection(String),

    #[error("cannot parse {what} from '{text}'")]
    Parse { what: &'static str, text: String },

    #[error("mask has nside {found}, expected {expected}")]
    NsideMismatch { expected: u32, found: u32 },

    #[error("covariance matrix is singular")]
    SingularCovariance,

    /// A correlation bin with zero DD pairs has no Poisson error.
    #[error("bin {bin} has zero DD pairs")]
    EmptyBin { bin: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CatalogError {
    pub fn invalid<S: Into<String>>(reason: S) -> Self {
        CatalogError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type CatalogResult<T> = Result<T, CatalogError>;
