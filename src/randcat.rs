use num::traits::FloatConst;
use rand::Rng;

use crate::error::{CatalogError, CatalogResult};
use crate::mask::{append_mask_columns, AngularUnits, PixelMask};
use crate::table::Table;

/// Draws `n` points uniformly distributed on the sphere inside an ra/dec
/// box: ra uniform in its range, dec through a uniform draw in
/// cos(colatitude).
pub fn uniform_radec<R: Rng>(
    n: usize,
    ra_range: (f64, f64),
    dec_range: (f64, f64),
    rng: &mut R,
) -> CatalogResult<(Vec<f64>, Vec<f64>)> {
    if n == 0 {
        return Err(CatalogError::invalid("asked for zero random points"));
    }
    let (ra_lo, ra_hi) = ra_range;
    let (dec_lo, dec_hi) = dec_range;
    if !(-180.0..=360.0).contains(&ra_lo) || !(-180.0..=360.0).contains(&ra_hi) || ra_lo >= ra_hi {
        return Err(CatalogError::invalid(format!(
            "bad ra range [{}, {}]",
            ra_lo, ra_hi
        )));
    }
    if !(-90.0..=90.0).contains(&dec_lo) || !(-90.0..=90.0).contains(&dec_hi) || dec_lo >= dec_hi {
        return Err(CatalogError::invalid(format!(
            "bad dec range [{}, {}]",
            dec_lo, dec_hi
        )));
    }

    let cth_lo = ((90.0 - dec_lo) * f64::PI() / 180.0).cos();
    let cth_hi = ((90.0 - dec_hi) * f64::PI() / 180.0).cos();
    let mut ra = Vec::with_capacity(n);
    let mut dec = Vec::with_capacity(n);
    for _ in 0..n {
        ra.push(rng.gen_range(ra_lo..ra_hi));
        let cth = rng.gen_range(cth_lo..cth_hi);
        dec.push(90.0 - cth.acos() * 180.0 / f64::PI());
    }
    Ok((ra, dec))
}

/// Assembles a random catalog table with `ra`/`dec` columns and one
/// appended column per mask.
pub fn random_catalog<R: Rng>(
    n: usize,
    ra_range: (f64, f64),
    dec_range: (f64, f64),
    masks: &[PixelMask],
    mask_names: &[String],
    rng: &mut R,
) -> CatalogResult<Table> {
    let (ra, dec) = uniform_radec(n, ra_range, dec_range, rng)?;
    let mut table = Table::new();
    table.push_numeric_column("ra", ra)?;
    table.push_numeric_column("dec", dec)?;
    if !masks.is_empty() || !mask_names.is_empty() {
        append_mask_columns(
            &mut table,
            masks,
            mask_names,
            "ra",
            "dec",
            AngularUnits::Degrees,
        )?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn points_stay_inside_the_box() {
        let mut rng = StdRng::seed_from_u64(0);
        let (ra, dec) = uniform_radec(2000, (10.0, 20.0), (-30.0, -10.0), &mut rng).unwrap();
        assert_eq!(ra.len(), 2000);
        assert!(ra.iter().all(|&r| (10.0..20.0).contains(&r)));
        assert!(dec.iter().all(|&d| (-30.0..-10.0).contains(&d)));
    }

    #[test]
    fn same_seed_reproduces_the_catalog() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let first = uniform_radec(100, (0.0, 90.0), (0.0, 90.0), &mut a).unwrap();
        let second = uniform_radec(100, (0.0, 90.0), (0.0, 90.0), &mut b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dec_follows_the_sphere_not_the_plane() {
        // Uniform on the sphere puts sin(30 deg) = half of all points in
        // |dec| < 30; uniform in dec would put a third there.
        let mut rng = StdRng::seed_from_u64(1);
        let (_, dec) = uniform_radec(20000, (0.0, 360.0), (-90.0, 90.0), &mut rng).unwrap();
        let inner = dec.iter().filter(|d| d.abs() < 30.0).count() as f64 / 20000.0;
        assert!(
            (0.45..0.55).contains(&inner),
            "fraction within 30 deg was {}",
            inner
        );
    }

    #[test]
    fn catalog_carries_mask_columns() {
        let mut rng = StdRng::seed_from_u64(2);
        let mask = PixelMask::new(64).unwrap();
        let table = random_catalog(
            50,
            (0.0, 90.0),
            (0.0, 45.0),
            &[mask],
            &["window".to_owned()],
            &mut rng,
        )
        .unwrap();
        assert_eq!(table.rows(), 50);
        let window = table.numeric("window").unwrap();
        assert!(window.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejects_degenerate_requests() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(uniform_radec(0, (0.0, 1.0), (0.0, 1.0), &mut rng).is_err());
        assert!(uniform_radec(10, (5.0, 5.0), (0.0, 1.0), &mut rng).is_err());
        assert!(uniform_radec(10, (0.0, 1.0), (-100.0, 0.0), &mut rng).is_err());
        assert!(uniform_radec(10, (400.0, 410.0), (0.0, 1.0), &mut rng).is_err());
    }
}
