use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// A named angular correlation function: (angle, w, error) per bin.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFunction {
    pub name: String,
    pub angle: Vec<f64>,
    pub w: Vec<f64>,
    pub error: Vec<f64>,
}

impl CorrelationFunction {
    pub fn new(name: &str) -> Self {
        CorrelationFunction {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    pub fn bin(&self, i: usize) -> (f64, f64, f64) {
        (self.angle[i], self.w[i], self.error[i])
    }
}

/// Pair counts of one angular clustering measurement: per-bin DD/DR/RD/RR
/// pair totals plus the object counts of the two data and two random
/// catalogs, the inputs of the Landy-Szalay estimator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeasuredWTheta {
    pub theta: Vec<f64>,
    #[serde(rename = "DD")]
    pub dd: Vec<f64>,
    #[serde(rename = "DR")]
    pub dr: Vec<f64>,
    #[serde(rename = "RD")]
    pub rd: Vec<f64>,
    #[serde(rename = "RR")]
    pub rr: Vec<f64>,
    #[serde(rename = "Nd1")]
    pub nd1: f64,
    #[serde(rename = "Nd2")]
    pub nd2: f64,
    #[serde(rename = "Nr1")]
    pub nr1: f64,
    #[serde(rename = "Nr2")]
    pub nr2: f64,
}

impl MeasuredWTheta {
    /// Validates and stores one measurement. The five per-bin arrays must
    /// share a length, the totals must be positive, and RR must be nonzero
    /// in every bin.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        theta: Vec<f64>,
        dd: Vec<f64>,
        dr: Vec<f64>,
        rd: Vec<f64>,
        rr: Vec<f64>,
        nd1: f64,
        nd2: f64,
        nr1: f64,
        nr2: f64,
    ) -> CatalogResult<Self> {
        let n = theta.len();
        if n == 0 {
            return Err(CatalogError::invalid("no angular bins"));
        }
        for (name, arr) in [("DD", &dd), ("DR", &dr), ("RD", &rd), ("RR", &rr)] {
            if arr.len() != n {
                return Err(CatalogError::invalid(format!(
                    "{} has {} bins but theta has {}",
                    name,
                    arr.len(),
                    n
                )));
            }
        }
        for (name, v) in [("Nd1", nd1), ("Nd2", nd2), ("Nr1", nr1), ("Nr2", nr2)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(CatalogError::invalid(format!(
                    "catalog total {} = {} must be positive",
                    name, v
                )));
            }
        }
        if let Some(bin) = rr.iter().position(|&x| !(x > 0.0)) {
            return Err(CatalogError::invalid(format!(
                "RR is zero in bin {}, estimator undefined",
                bin
            )));
        }
        Ok(MeasuredWTheta {
            theta,
            dd,
            dr,
            rd,
            rr,
            nd1,
            nd2,
            nr1,
            nr2,
        })
    }

    /// The Landy-Szalay estimate per bin.
    pub fn estimate(&self) -> Vec<f64> {
        self.dd
            .iter()
            .zip(self.dr.iter().zip(self.rd.iter().zip(self.rr.iter())))
            .map(|(&dd, (&dr, (&rd, &rr)))| {
                1.0 + (dd / rr) * (self.nr1 * self.nr2) / (self.nd1 * self.nd2)
                    - (dr / rr) * (self.nr1 / self.nd1)
                    - (rd / rr) * (self.nr2 / self.nd2)
            })
            .collect()
    }

    /// Poisson errors (1 + w)/sqrt(DD); a zero-DD bin has none.
    pub fn poisson_errors(&self) -> CatalogResult<Vec<f64>> {
        self.dd
            .iter()
            .zip(self.estimate())
            .enumerate()
            .map(|(bin, (&dd, w))| {
                if dd > 0.0 {
                    Ok((1.0 + w) / dd.sqrt())
                } else {
                    Err(CatalogError::EmptyBin { bin })
                }
            })
            .collect()
    }

    /// The measurement as a named correlation function with Poisson errors.
    pub fn correlation_function(&self, name: &str) -> CatalogResult<CorrelationFunction> {
        Ok(CorrelationFunction {
            name: name.to_owned(),
            angle: self.theta.clone(),
            w: self.estimate(),
            error: self.poisson_errors()?,
        })
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> CatalogResult<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        info!(
            "wrote {} bins of pair counts to {}",
            self.theta.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let file = File::open(path.as_ref())?;
        let raw: MeasuredWTheta = serde_json::from_reader(BufReader::new(file))?;
        MeasuredWTheta::new(
            raw.theta, raw.dd, raw.dr, raw.rd, raw.rr, raw.nd1, raw.nd2, raw.nr1, raw.nr2,
        )
    }
}

fn parse_field(what: &'static str, text: &str) -> CatalogResult<f64> {
    text.parse::<f64>().map_err(|_| CatalogError::Parse {
        what,
        text: text.to_owned(),
    })
}

/// A measured w(theta) with its covariance, as read from Athena output.
#[derive(Clone, Debug, Default)]
pub struct DataW {
    pub function: CorrelationFunction,
    covariance: Option<DMatrix<f64>>,
}

impl DataW {
    pub fn new(name: &str) -> Self {
        DataW {
            function: CorrelationFunction::new(name),
            covariance: None,
        }
    }

    /// Reads an Athena correlation-function file: whitespace-separated
    /// angle, w and error columns, `#` lines skipped. The bin count must
    /// agree with a previously loaded covariance.
    pub fn read_athena_function<P: AsRef<Path>>(&mut self, path: P) -> CatalogResult<()> {
        let text = fs::read_to_string(path.as_ref())?;
        let mut angle = Vec::new();
        let mut w = Vec::new();
        let mut error = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(CatalogError::Parse {
                    what: "athena w(theta) row",
                    text: line.to_owned(),
                });
            }
            angle.push(parse_field("athena angle", fields[0])?);
            w.push(parse_field("athena w", fields[1])?);
            error.push(parse_field("athena error", fields[2])?);
        }
        if angle.is_empty() {
            return Err(CatalogError::invalid("empty w(theta) file"));
        }
        if let Some(cov) = &self.covariance {
            if cov.nrows() != angle.len() {
                return Err(CatalogError::invalid(format!(
                    "w(theta) has {} bins but the loaded covariance is {}x{}",
                    angle.len(),
                    cov.nrows(),
                    cov.ncols()
                )));
            }
        }
        info!(
            "read {} w(theta) bins from {}",
            angle.len(),
            path.as_ref().display()
        );
        self.function.angle = angle;
        self.function.w = w;
        self.function.error = error;
        Ok(())
    }

    /// Reads an N x N Athena covariance block. The dimension must agree
    /// with a previously loaded function.
    pub fn read_athena_covariance<P: AsRef<Path>>(&mut self, path: P) -> CatalogResult<()> {
        let text = fs::read_to_string(path.as_ref())?;
        let mut values = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            for field in line.split_whitespace() {
                values.push(parse_field("covariance entry", field)?);
            }
        }
        let n = (values.len() as f64).sqrt().round() as usize;
        if n == 0 || n * n != values.len() {
            return Err(CatalogError::invalid(format!(
                "covariance file holds {} values, not a square matrix",
                values.len()
            )));
        }
        if !self.function.is_empty() && n != self.function.len() {
            return Err(CatalogError::invalid(format!(
                "covariance is {0}x{0} but w(theta) has {1} bins",
                n,
                self.function.len()
            )));
        }
        self.covariance = Some(DMatrix::from_row_slice(n, n, &values));
        Ok(())
    }

    /// Replaces the covariance by diag(error^2).
    pub fn set_diagonal_covariance(&mut self) -> CatalogResult<()> {
        if self.function.is_empty() {
            return Err(CatalogError::invalid("no measurement loaded"));
        }
        let n = self.function.len();
        let mut cov = DMatrix::zeros(n, n);
        for (i, &e) in self.function.error.iter().enumerate() {
            cov[(i, i)] = e * e;
        }
        self.covariance = Some(cov);
        Ok(())
    }

    /// chi-square of a theory vector against this measurement through the
    /// inverse covariance.
    pub fn chi2(&self, theory: &[f64]) -> CatalogResult<f64> {
        if self.function.is_empty() {
            return Err(CatalogError::invalid("no measurement loaded"));
        }
        if theory.len() != self.function.len() {
            return Err(CatalogError::invalid(format!(
                "theory has {} bins but the data has {}",
                theory.len(),
                self.function.len()
            )));
        }
        let cov = self
            .covariance
            .as_ref()
            .ok_or_else(|| CatalogError::invalid("no covariance loaded"))?;
        let inverse = cov
            .clone()
            .try_inverse()
            .ok_or(CatalogError::SingularCovariance)?;
        let n = self.function.len();
        let mut chi2 = 0.0;
        for i in 0..n {
            for j in 0..n {
                chi2 += (self.function.w[i] - theory[i])
                    * (self.function.w[j] - theory[j])
                    * inverse[(i, j)];
            }
        }
        Ok(chi2)
    }
}

/// Theory prediction rescaled by the magnification slope and galaxy bias,
/// w = w0 * alpha * bias.
#[derive(Clone, Debug)]
pub struct TheoMagW {
    pub function: CorrelationFunction,
    w0: Vec<f64>,
    alpha: f64,
    bias: f64,
}

impl TheoMagW {
    pub fn new(name: &str, bias: f64, alpha: f64) -> Self {
        TheoMagW {
            function: CorrelationFunction::new(name),
            w0: Vec::new(),
            alpha,
            bias,
        }
    }

    /// Reads a two-column text file of angle and unscaled w0.
    pub fn read_function<P: AsRef<Path>>(&mut self, path: P) -> CatalogResult<()> {
        let text = fs::read_to_string(path.as_ref())?;
        let mut angle = Vec::new();
        let mut w0 = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 2 {
                return Err(CatalogError::Parse {
                    what: "theory w(theta) row",
                    text: line.to_owned(),
                });
            }
            angle.push(parse_field("theory angle", fields[0])?);
            w0.push(parse_field("theory w0", fields[1])?);
        }
        if angle.is_empty() {
            return Err(CatalogError::invalid("empty theory file"));
        }
        self.function.angle = angle;
        self.function.error = vec![0.0; w0.len()];
        self.w0 = w0;
        self.rescale();
        Ok(())
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
        self.rescale();
    }

    pub fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
        self.rescale();
    }

    fn rescale(&mut self) {
        self.function.w = self
            .w0
            .iter()
            .map(|&x| x * self.alpha * self.bias)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_counts() -> MeasuredWTheta {
        MeasuredWTheta::new(
            vec![1.0, 2.0],
            vec![10.0, 20.0],
            vec![12.0, 10.0],
            vec![14.0, 8.0],
            vec![16.0, 40.0],
            100.0,
            200.0,
            300.0,
            400.0,
        )
        .unwrap()
    }

    #[test]
    fn landy_szalay_matches_hand_computation() {
        let counts = sample_counts();
        let w = counts.estimate();
        // 1 + (10/16)*6 - (12/16)*3 - (14/16)*2
        assert_abs_diff_eq!(w[0], 0.75, epsilon = 1e-12);
        // 1 + (20/40)*6 - (10/40)*3 - (8/40)*2
        assert_abs_diff_eq!(w[1], 2.85, epsilon = 1e-12);

        let errors = counts.poisson_errors().unwrap();
        assert_abs_diff_eq!(errors[0], 1.75 / 10f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(errors[1], 3.85 / 20f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn counts_are_validated() {
        assert!(matches!(
            MeasuredWTheta::new(
                vec![1.0],
                vec![1.0, 2.0],
                vec![1.0],
                vec![1.0],
                vec![1.0],
                1.0,
                1.0,
                1.0,
                1.0
            ),
            Err(CatalogError::InvalidInput { .. })
        ));
        assert!(matches!(
            MeasuredWTheta::new(
                vec![1.0],
                vec![1.0],
                vec![1.0],
                vec![1.0],
                vec![0.0],
                1.0,
                1.0,
                1.0,
                1.0
            ),
            Err(CatalogError::InvalidInput { .. })
        ));
        assert!(matches!(
            MeasuredWTheta::new(
                vec![1.0],
                vec![1.0],
                vec![1.0],
                vec![1.0],
                vec![1.0],
                0.0,
                1.0,
                1.0,
                1.0
            ),
            Err(CatalogError::InvalidInput { .. })
        ));
    }

    #[test]
    fn zero_dd_bin_has_no_poisson_error() {
        let counts = MeasuredWTheta::new(
            vec![1.0],
            vec![0.0],
            vec![1.0],
            vec![1.0],
            vec![4.0],
            10.0,
            10.0,
            10.0,
            10.0,
        )
        .unwrap();
        assert!(counts.estimate()[0].is_finite());
        assert!(matches!(
            counts.poisson_errors(),
            Err(CatalogError::EmptyBin { bin: 0 })
        ));
    }

    #[test]
    fn pair_counts_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wtheta.json");
        let counts = sample_counts();
        counts.save_json(&path).unwrap();
        let back = MeasuredWTheta::load_json(&path).unwrap();
        assert_eq!(back.estimate(), counts.estimate());
        assert_abs_diff_eq!(back.nr2, 400.0, epsilon = 0.0);
    }

    #[test]
    fn diagonal_chi2_is_the_weighted_residual_sum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("athena.txt");
        std::fs::write(&path, "# theta w err\n0.1 1.0 0.5\n0.2 2.0 0.25\n").unwrap();

        let mut data = DataW::new("measurement");
        data.read_athena_function(&path).unwrap();
        data.set_diagonal_covariance().unwrap();
        let chi2 = data.chi2(&[0.5, 1.0]).unwrap();
        assert_abs_diff_eq!(chi2, 0.25 / 0.25 + 1.0 / 0.0625, epsilon = 1e-9);
    }

    #[test]
    fn covariance_file_feeds_the_full_quadratic_form() {
        let dir = tempfile::tempdir().unwrap();
        let fpath = dir.path().join("athena.txt");
        let cpath = dir.path().join("cov.txt");
        std::fs::write(&fpath, "0.1 2.0 0.1\n0.2 3.0 0.1\n").unwrap();
        std::fs::write(&cpath, "2 1\n1 2\n").unwrap();

        let mut data = DataW::new("measurement");
        data.read_athena_function(&fpath).unwrap();
        data.read_athena_covariance(&cpath).unwrap();
        // residual (1, 1) against inverse [[2,-1],[-1,2]]/3
        let chi2 = data.chi2(&[1.0, 2.0]).unwrap();
        assert_abs_diff_eq!(chi2, 2.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn dimension_mismatches_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fpath = dir.path().join("athena.txt");
        let cpath = dir.path().join("cov.txt");
        std::fs::write(&fpath, "0.1 1.0 0.5\n0.2 2.0 0.25\n").unwrap();
        std::fs::write(&cpath, "1 0 0\n0 1 0\n0 0 1\n").unwrap();

        let mut data = DataW::new("measurement");
        data.read_athena_function(&fpath).unwrap();
        assert!(data.read_athena_covariance(&cpath).is_err());
        data.set_diagonal_covariance().unwrap();
        assert!(data.chi2(&[1.0]).is_err());

        let mut ragged = DataW::new("ragged");
        let rpath = dir.path().join("ragged.txt");
        std::fs::write(&rpath, "1 2 3\n4 5\n").unwrap();
        assert!(ragged.read_athena_covariance(&rpath).is_err());
    }

    #[test]
    fn singular_covariance_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fpath = dir.path().join("athena.txt");
        let cpath = dir.path().join("cov.txt");
        std::fs::write(&fpath, "0.1 1.0 0.5\n0.2 2.0 0.25\n").unwrap();
        std::fs::write(&cpath, "1 1\n1 1\n").unwrap();

        let mut data = DataW::new("measurement");
        data.read_athena_function(&fpath).unwrap();
        data.read_athena_covariance(&cpath).unwrap();
        assert!(matches!(
            data.chi2(&[1.0, 1.0]),
            Err(CatalogError::SingularCovariance)
        ));
    }

    #[test]
    fn theory_rescales_with_alpha_and_bias() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theory.txt");
        std::fs::write(&path, "1 2\n2 4\n").unwrap();

        let mut theory = TheoMagW::new("lbg", 2.0, 0.5);
        theory.read_function(&path).unwrap();
        assert_abs_diff_eq!(theory.function.w[0], 2.0, epsilon = 0.0);
        assert_abs_diff_eq!(theory.function.w[1], 4.0, epsilon = 0.0);

        theory.set_alpha(2.0);
        assert_abs_diff_eq!(theory.function.w[0], 8.0, epsilon = 0.0);
        theory.set_bias(1.0);
        assert_abs_diff_eq!(theory.function.w[1], 8.0, epsilon = 0.0);
        assert!(theory.function.error.iter().all(|&e| e == 0.0));
    }
}
