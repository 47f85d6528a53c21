//! Derived parameter calculator.
//!
//! Synthesizes parameters not present on the wire after assembly:
//! hybrid-level pressure from vertical coefficients plus surface
//! pressure, and relative humidity from temperature, pressure and
//! specific humidity. Missing any required input at a cell yields a
//! missing result at that cell; no partial formulas.

use crate::dataset::Dataset;
use crate::field::Field;
use chrono::{DateTime, Utc};
use grid_common::{level_types, params};
use std::collections::HashMap;
use tracing::debug;

/// Surface pressure at or above this value can only be Pa.
const PASCAL_THRESHOLD: f32 = 1500.0;

/// Vertical (a, b) coefficient pairs keyed by hybrid level value.
///
/// Populated lazily the first time each level value is seen, from the
/// coefficient side channel attached to hybrid-level records.
#[derive(Debug, Default)]
pub struct VerticalCoefficients {
    entries: HashMap<u64, (f64, f64)>,
}

impl VerticalCoefficients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the coefficient table seen on a record of this level.
    ///
    /// Two table conventions exist, distinguished by length: a direct
    /// per-level (a, b) pair, or one table shared across all levels
    /// where level k's coefficients average the adjacent table entries.
    /// The shared-table averaging is inherited from the upstream
    /// formula and preserved verbatim.
    pub fn observe(&mut self, level_value: f64, table: &[f64]) {
        let key = level_value.to_bits();
        if self.entries.contains_key(&key) {
            return;
        }
        let pair = if table.len() == 2 {
            Some((table[0], table[1]))
        } else {
            let half = table.len() / 2;
            let k = level_value.round() as usize;
            if k >= 1 && k < half {
                let a = (table[k - 1] + table[k]) / 2.0;
                let b = (table[half + k - 1] + table[half + k]) / 2.0;
                Some((a, b))
            } else {
                None
            }
        };
        if let Some(pair) = pair {
            debug!(level = level_value, a = pair.0, b = pair.1, "Vertical coefficients");
            self.entries.insert(key, pair);
        }
    }

    pub fn get(&self, level_value: f64) -> Option<(f64, f64)> {
        self.entries.get(&level_value.to_bits()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hybrid-level pressure in the dataset's legacy hPa/100 convention.
///
/// The surface pressure unit is auto-detected: values at or above 1500
/// are Pa and scaled back to hPa first.
pub fn hybrid_pressure(a: f64, b: f64, surface_pressure: f32) -> f32 {
    if surface_pressure.is_nan() {
        return f32::NAN;
    }
    let ps_hpa = if surface_pressure >= PASCAL_THRESHOLD {
        surface_pressure / 100.0
    } else {
        surface_pressure
    };
    ((a + b * ps_hpa as f64) / 100.0) as f32
}

/// Saturation vapor pressure in hPa for a temperature in Celsius, with
/// the over-ice branch below -5 C.
fn saturation_vapor_pressure(t: f32) -> f32 {
    if t >= -5.0 {
        6.107 * 10f32.powf(7.5 * t / (237.0 + t))
    } else {
        6.107 * 10f32.powf(9.5 * t / (265.5 + t))
    }
}

/// Relative humidity in percent from temperature (Celsius), pressure
/// (hPa) and specific humidity (kg/kg), clamped to [0, 100].
pub fn relative_humidity(t_c: f32, p_hpa: f32, q: f32) -> f32 {
    if t_c.is_nan() || p_hpa.is_nan() || q.is_nan() {
        return f32::NAN;
    }
    let es = saturation_vapor_pressure(t_c);
    let e = p_hpa * q / 0.622;
    let rh = (e / es) * (p_hpa - es) / (p_hpa - e);
    rh.clamp(0.0, 1.0) * 100.0
}

/// Fill missing hybrid-level pressure cells from the coefficient table
/// and the per-time surface pressure fields.
///
/// The surface pressure fields must already be on the dataset's grid;
/// times without one are left missing.
pub fn derive_hybrid_pressure(
    dataset: &mut Dataset,
    coeffs: &VerticalCoefficients,
    surface_pressure: &HashMap<DateTime<Utc>, Field>,
) {
    let Some(p_idx) = dataset.axes().param_index(params::PRESSURE) else {
        return;
    };
    let times = dataset.axes().times.times();
    let levels = dataset.axes().levels.clone();
    let (nx, ny) = (dataset.axes().grid.nx, dataset.axes().grid.ny);

    for (t, time) in times.iter().enumerate() {
        let Some(sp) = surface_pressure.get(time) else {
            continue;
        };
        if sp.grid != dataset.axes().grid {
            continue;
        }
        for (l, level) in levels.iter().enumerate() {
            let Some((a, b)) = coeffs.get(*level) else {
                continue;
            };
            for row in 0..ny {
                for col in 0..nx {
                    if dataset.get(t, l, p_idx, col, row).is_nan() {
                        let v = hybrid_pressure(a, b, sp.get(col, row));
                        if !v.is_nan() {
                            dataset.set(t, l, p_idx, col, row, v);
                        }
                    }
                }
            }
        }
    }
}

/// Fill missing relative humidity cells from temperature, pressure and
/// specific humidity. Present values are never overwritten.
///
/// On isobaric levels the pressure is the level value itself; elsewhere
/// it is read from the pressure parameter.
pub fn derive_relative_humidity(dataset: &mut Dataset) {
    let axes = dataset.axes();
    let Some(rh_idx) = axes.param_index(params::RELATIVE_HUMIDITY) else {
        return;
    };
    let Some(t_idx) = axes.param_index(params::TEMPERATURE) else {
        return;
    };
    let Some(q_idx) = axes.param_index(params::SPECIFIC_HUMIDITY) else {
        return;
    };
    let p_idx = axes.param_index(params::PRESSURE);
    let isobaric = axes.level_type == level_types::ISOBARIC;
    if p_idx.is_none() && !isobaric {
        return;
    }

    let nt = axes.times.len();
    let levels = axes.levels.clone();
    let (nx, ny) = (axes.grid.nx, axes.grid.ny);

    for t in 0..nt {
        for (l, level) in levels.iter().enumerate() {
            for row in 0..ny {
                for col in 0..nx {
                    if !dataset.get(t, l, rh_idx, col, row).is_nan() {
                        continue;
                    }
                    let temp = dataset.get(t, l, t_idx, col, row);
                    let q = dataset.get(t, l, q_idx, col, row);
                    let pressure = match p_idx {
                        Some(p) => dataset.get(t, l, p, col, row),
                        None => *level as f32,
                    };
                    let rh = relative_humidity(temp, pressure, q);
                    if !rh.is_nan() {
                        dataset.set(t, l, rh_idx, col, row, rh);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hybrid_pressure_pinned_hpa_case() {
        // 1013 is below the Pa threshold, so it is already hPa; the
        // legacy /100 normalization gives 10.13.
        let p = hybrid_pressure(0.0, 1.0, 1013.0);
        assert!((p - 10.13).abs() < 1e-4, "p = {}", p);
    }

    #[test]
    fn test_hybrid_pressure_pascal_detection() {
        // The same surface pressure in Pa autodetects and agrees.
        let p = hybrid_pressure(0.0, 1.0, 101300.0);
        assert!((p - 1013.0).abs() < 1e-3, "p = {}", p);
    }

    #[test]
    fn test_hybrid_pressure_missing_input() {
        assert!(hybrid_pressure(0.0, 1.0, f32::NAN).is_nan());
    }

    #[test]
    fn test_coefficients_direct_pair() {
        let mut coeffs = VerticalCoefficients::new();
        coeffs.observe(7.0, &[500.0, 0.3]);
        assert_eq!(coeffs.get(7.0), Some((500.0, 0.3)));
    }

    #[test]
    fn test_coefficients_shared_table_averages_adjacent() {
        // Pinned legacy behavior: level k averages table entries k-1
        // and k in each half.
        let table = [0.0, 1000.0, 2000.0, 0.2, 0.4, 0.6];
        let mut coeffs = VerticalCoefficients::new();
        coeffs.observe(1.0, &table);
        coeffs.observe(2.0, &table);
        let (a, b) = coeffs.get(1.0).unwrap();
        assert_eq!(a, 500.0);
        assert!((b - 0.3).abs() < 1e-12);
        let (a, b) = coeffs.get(2.0).unwrap();
        assert_eq!(a, 1500.0);
        assert!((b - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_coefficients_populated_once() {
        let mut coeffs = VerticalCoefficients::new();
        coeffs.observe(1.0, &[100.0, 0.1]);
        coeffs.observe(1.0, &[999.0, 0.9]);
        assert_eq!(coeffs.get(1.0), Some((100.0, 0.1)));
    }

    #[test]
    fn test_rh_in_bounds() {
        for &t in &[-40.0f32, -5.0, 0.0, 15.0, 35.0] {
            for &p in &[300.0f32, 850.0, 1013.0] {
                for &q in &[0.0f32, 0.0005, 0.004, 0.02, 0.1] {
                    let rh = relative_humidity(t, p, q);
                    assert!(
                        (0.0..=100.0).contains(&rh),
                        "rh = {} for t={}, p={}, q={}",
                        rh,
                        t,
                        p,
                        q
                    );
                }
            }
        }
    }

    #[test]
    fn test_rh_missing_input_is_missing() {
        assert!(relative_humidity(f32::NAN, 1000.0, 0.01).is_nan());
        assert!(relative_humidity(15.0, f32::NAN, 0.01).is_nan());
        assert!(relative_humidity(15.0, 1000.0, f32::NAN).is_nan());
    }

    #[test]
    fn test_rh_plausible_midlatitude_value() {
        // 15 C at 1013 hPa: es ~ 17 hPa. q = 0.0075 kg/kg gives a
        // mixing-ratio vapor pressure around 12 hPa, roughly 70% RH.
        let rh = relative_humidity(15.0, 1013.0, 0.0075);
        assert!((60.0..80.0).contains(&rh), "rh = {}", rh);
    }
}
