use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use log::info;
use num::traits::FloatConst;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::selection::Selection;
use crate::table::Table;

/// Units of input sky coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngularUnits {
    Degrees,
    Radians,
    Arcmin,
}

impl AngularUnits {
    fn to_degrees(self, x: f64) -> f64 {
        match self {
            AngularUnits::Degrees => x,
            AngularUnits::Radians => x * 180.0 / f64::PI(),
            AngularUnits::Arcmin => x / 60.0,
        }
    }
}

impl FromStr for AngularUnits {
    type Err = CatalogError;

    fn from_str(s: &str) -> CatalogResult<Self> {
        match s {
            "degrees" => Ok(AngularUnits::Degrees),
            "radians" => Ok(AngularUnits::Radians),
            "arcmin" => Ok(AngularUnits::Arcmin),
            _ => Err(CatalogError::Parse {
                what: "angular units",
                text: s.to_owned(),
            }),
        }
    }
}

fn depth_for(nside: u32) -> CatalogResult<u8> {
    if nside == 0 || !nside.is_power_of_two() {
        return Err(CatalogError::invalid(format!(
            "nside {} is not a power of two",
            nside
        )));
    }
    let depth = nside.trailing_zeros() as u8;
    if depth > 29 {
        return Err(CatalogError::invalid(format!(
            "nside {} is beyond depth 29",
            nside
        )));
    }
    Ok(depth)
}

/// NESTED pixel index at `nside` of a position in degrees. ra wraps into
/// [0, 360); dec must lie in [-90, 90].
pub fn pixel_at(nside: u32, ra: f64, dec: f64) -> CatalogResult<u64> {
    let depth = depth_for(nside)?;
    if !ra.is_finite() || !dec.is_finite() || !(-90.0..=90.0).contains(&dec) {
        return Err(CatalogError::invalid(format!(
            "({}, {}) is not a sky position",
            ra, dec
        )));
    }
    let lon = ra.to_radians().rem_euclid(2.0 * f64::PI());
    let lat = dec
        .to_radians()
        .clamp(-f64::FRAC_PI_2(), f64::FRAC_PI_2());
    Ok(cdshealpix::nested::hash(depth, lon, lat))
}

/// Sparse HEALPix map in the NESTED scheme. Pixels never written read back
/// as 0, matching a zero-initialized dense map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PixelMask {
    nside: u32,
    pixels: BTreeMap<u64, f64>,
}

impl PixelMask {
    pub fn new(nside: u32) -> CatalogResult<Self> {
        depth_for(nside)?;
        Ok(PixelMask {
            nside,
            pixels: BTreeMap::new(),
        })
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    pub fn npix(&self) -> u64 {
        cdshealpix::n_hash(self.depth())
    }

    fn depth(&self) -> u8 {
        // nside is validated on construction and on read.
        self.nside.trailing_zeros() as u8
    }

    /// Number of pixels carrying an explicit value.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, pixel: u64) -> f64 {
        self.pixels.get(&pixel).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, pixel: u64, value: f64) -> CatalogResult<()> {
        if pixel >= self.npix() {
            return Err(CatalogError::invalid(format!(
                "pixel {} out of range for nside {}",
                pixel, self.nside
            )));
        }
        self.pixels.insert(pixel, value);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.pixels.iter().map(|(&p, &v)| (p, v))
    }

    pub fn pixel_at(&self, ra: f64, dec: f64) -> CatalogResult<u64> {
        pixel_at(self.nside, ra, dec)
    }

    /// Samples the mask at the given positions: one value per position,
    /// absent pixels reading 0.
    pub fn values_at(
        &self,
        ra: &[f64],
        dec: &[f64],
        units: AngularUnits,
    ) -> CatalogResult<Vec<f64>> {
        if ra.is_empty() || dec.is_empty() {
            return Err(CatalogError::invalid("no positions given"));
        }
        if ra.len() != dec.len() {
            return Err(CatalogError::invalid(format!(
                "{} ra values for {} dec values",
                ra.len(),
                dec.len()
            )));
        }
        ra.iter()
            .zip(dec.iter())
            .map(|(&r, &d)| {
                let pix = pixel_at(self.nside, units.to_degrees(r), units.to_degrees(d))?;
                Ok(self.get(pix))
            })
            .collect()
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let file = File::open(path.as_ref())?;
        let mask: PixelMask = serde_json::from_reader(BufReader::new(file))?;
        depth_for(mask.nside)?;
        if let Some((&pix, _)) = mask.pixels.iter().next_back() {
            if pix >= mask.npix() {
                return Err(CatalogError::invalid(format!(
                    "pixel {} out of range for nside {}",
                    pix, mask.nside
                )));
            }
        }
        info!(
            "read mask nside {} ({} filled pixels) from {}",
            mask.nside,
            mask.pixels.len(),
            path.as_ref().display()
        );
        Ok(mask)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> CatalogResult<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        info!(
            "wrote mask nside {} ({} filled pixels) to {}",
            self.nside,
            self.pixels.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

/// Per-pixel maximum of a catalog quantity, the survey-depth construction:
/// each position's pixel keeps the largest value seen there.
pub fn max_map(nside: u32, ra: &[f64], dec: &[f64], values: &[f64]) -> CatalogResult<PixelMask> {
    if ra.len() != dec.len() || ra.len() != values.len() {
        return Err(CatalogError::invalid(format!(
            "ra/dec/value lengths differ: {}/{}/{}",
            ra.len(),
            dec.len(),
            values.len()
        )));
    }
    let mut mask = PixelMask::new(nside)?;
    for ((&r, &d), &v) in ra.iter().zip(dec.iter()).zip(values.iter()) {
        let pix = pixel_at(nside, r, d)?;
        let entry = mask.pixels.entry(pix).or_insert(v);
        if v > *entry {
            *entry = v;
        }
    }
    Ok(mask)
}

/// Appends one numeric column per mask, sampled at the catalog's positions
/// (taken from `ra_col`/`dec_col`, interpreted in `units`).
pub fn append_mask_columns(
    table: &mut Table,
    masks: &[PixelMask],
    names: &[String],
    ra_col: &str,
    dec_col: &str,
    units: AngularUnits,
) -> CatalogResult<()> {
    if masks.is_empty() {
        return Err(CatalogError::invalid("no masks given"));
    }
    if masks.len() != names.len() {
        return Err(CatalogError::invalid(format!(
            "{} masks but {} column names",
            masks.len(),
            names.len()
        )));
    }
    let ra = table.numeric(ra_col)?.to_vec();
    let dec = table.numeric(dec_col)?.to_vec();
    for (mask, name) in masks.iter().zip(names.iter()) {
        let values = mask.values_at(&ra, &dec, units)?;
        table.push_numeric_column(name, values)?;
    }
    Ok(())
}

/// Binary master mask: 1 exactly where every mask's value passes its
/// selection. All masks must share one nside; only pixels present in at
/// least one input can appear in the output.
pub fn master_mask(selections: &[Selection], masks: &[PixelMask]) -> CatalogResult<PixelMask> {
    if masks.is_empty() {
        return Err(CatalogError::invalid("no masks given"));
    }
    if selections.len() != masks.len() {
        return Err(CatalogError::invalid(format!(
            "{} selections for {} masks",
            selections.len(),
            masks.len()
        )));
    }
    let nside = masks[0].nside;
    for m in &masks[1..] {
        if m.nside != nside {
            return Err(CatalogError::NsideMismatch {
                expected: nside,
                found: m.nside,
            });
        }
    }
    let mut candidates: BTreeSet<u64> = BTreeSet::new();
    for m in masks {
        candidates.extend(m.pixels.keys().copied());
    }
    let mut out = PixelMask::new(nside)?;
    for &pix in &candidates {
        if selections
            .iter()
            .zip(masks.iter())
            .all(|(sel, m)| sel.contains(m.get(pix)))
        {
            out.pixels.insert(pix, 1.0);
        }
    }
    info!(
        "master mask keeps {} of {} candidate pixels",
        out.pixels.len(),
        candidates.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::parse_selections;
    use approx::assert_abs_diff_eq;

    #[test]
    fn nside_must_be_a_power_of_two_below_depth_30() {
        assert!(PixelMask::new(64).is_ok());
        assert!(PixelMask::new(4096).is_ok());
        assert!(matches!(
            PixelMask::new(0),
            Err(CatalogError::InvalidInput { .. })
        ));
        assert!(matches!(
            PixelMask::new(3),
            Err(CatalogError::InvalidInput { .. })
        ));
        assert!(matches!(
            PixelMask::new(1 << 30),
            Err(CatalogError::InvalidInput { .. })
        ));
    }

    #[test]
    fn absent_pixels_read_zero() {
        let mut mask = PixelMask::new(64).unwrap();
        mask.set(17, 0.75).unwrap();
        assert_abs_diff_eq!(mask.get(17), 0.75, epsilon = 0.0);
        assert_abs_diff_eq!(mask.get(18), 0.0, epsilon = 0.0);
        assert_eq!(mask.len(), 1);
        assert!(mask.set(mask.npix(), 1.0).is_err());
    }

    #[test]
    fn units_address_the_same_pixel() {
        let mut mask = PixelMask::new(256).unwrap();
        let pix = mask.pixel_at(45.0, 30.0).unwrap();
        mask.set(pix, 2.5).unwrap();

        let deg = mask
            .values_at(&[45.0], &[30.0], AngularUnits::Degrees)
            .unwrap();
        let arcmin = mask
            .values_at(&[45.0 * 60.0], &[30.0 * 60.0], AngularUnits::Arcmin)
            .unwrap();
        let rad = mask
            .values_at(
                &[45f64.to_radians()],
                &[30f64.to_radians()],
                AngularUnits::Radians,
            )
            .unwrap();
        assert_abs_diff_eq!(deg[0], 2.5, epsilon = 0.0);
        assert_abs_diff_eq!(arcmin[0], 2.5, epsilon = 0.0);
        assert_abs_diff_eq!(rad[0], 2.5, epsilon = 0.0);
    }

    #[test]
    fn ra_wraps_and_dec_is_validated() {
        assert_eq!(
            pixel_at(64, 370.0, 12.0).unwrap(),
            pixel_at(64, 10.0, 12.0).unwrap()
        );
        assert_eq!(
            pixel_at(64, -10.0, 12.0).unwrap(),
            pixel_at(64, 350.0, 12.0).unwrap()
        );
        assert!(pixel_at(64, 0.0, 90.0).is_ok());
        assert!(pixel_at(64, 0.0, -90.0).is_ok());
        assert!(pixel_at(64, 0.0, 90.5).is_err());
        assert!(pixel_at(64, f64::NAN, 0.0).is_err());
    }

    #[test]
    fn json_round_trip_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.json");
        let mut mask = PixelMask::new(128).unwrap();
        mask.set(3, 23.8).unwrap();
        mask.set(90000, 24.2).unwrap();
        mask.write_json(&path).unwrap();

        let back = PixelMask::read_json(&path).unwrap();
        assert_eq!(back.nside(), 128);
        assert_eq!(back.len(), 2);
        assert_abs_diff_eq!(back.get(90000), 24.2, epsilon = 0.0);
    }

    #[test]
    fn max_map_keeps_the_deepest_value() {
        let ra = [150.1, 150.1, 30.0];
        let dec = [2.2, 2.2, -45.0];
        let mag = [22.0, 24.5, 23.1];
        let mask = max_map(1024, &ra, &dec, &mag).unwrap();
        let deep = mask.pixel_at(150.1, 2.2).unwrap();
        assert_abs_diff_eq!(mask.get(deep), 24.5, epsilon = 0.0);
        assert_eq!(mask.len(), 2);
    }

    #[test]
    fn master_mask_applies_every_selection() {
        let mut depth = PixelMask::new(64).unwrap();
        let mut frac = PixelMask::new(64).unwrap();
        depth.set(1, 23.0).unwrap();
        depth.set(2, 20.0).unwrap();
        depth.set(3, 25.0).unwrap();
        frac.set(1, 0.5).unwrap();
        frac.set(2, 0.9).unwrap();
        frac.set(3, 0.2).unwrap();

        let selections = parse_selections("21,inf;0.4~,inf").unwrap();
        let master = master_mask(&selections, &[depth.clone(), frac.clone()]).unwrap();
        assert_abs_diff_eq!(master.get(1), 1.0, epsilon = 0.0);
        assert_abs_diff_eq!(master.get(2), 0.0, epsilon = 0.0);
        assert_abs_diff_eq!(master.get(3), 0.0, epsilon = 0.0);
        assert_eq!(master.len(), 1);

        let mismatched = PixelMask::new(128).unwrap();
        assert!(matches!(
            master_mask(&selections, &[depth, mismatched]),
            Err(CatalogError::NsideMismatch { .. })
        ));
    }

    #[test]
    fn mask_columns_append_to_the_catalog() {
        let mut table = Table::new();
        table
            .push_numeric_column("ra", vec![45.0, 46.0])
            .unwrap();
        table
            .push_numeric_column("dec", vec![30.0, -30.0])
            .unwrap();

        let mut mask = PixelMask::new(256).unwrap();
        let pix = mask.pixel_at(45.0, 30.0).unwrap();
        mask.set(pix, 1.0).unwrap();

        append_mask_columns(
            &mut table,
            &[mask],
            &["observed".to_owned()],
            "ra",
            "dec",
            AngularUnits::Degrees,
        )
        .unwrap();
        let observed = table.numeric("observed").unwrap();
        assert_abs_diff_eq!(observed[0], 1.0, epsilon = 0.0);
        assert_abs_diff_eq!(observed[1], 0.0, epsilon = 0.0);
    }
}
