//! Interpolation primitives for resampling.

use crate::config::InterpolationMethod;

/// Nearest neighbor interpolation.
///
/// Returns the value of the nearest grid point, or the missing marker
/// outside the grid.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if x < -0.5 || y < -0.5 {
        return f32::NAN;
    }
    let col = x.round() as usize;
    let row = y.round() as usize;

    if col >= width || row >= height {
        return f32::NAN;
    }

    data[row * width + col]
}

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest grid points. Any
/// missing corner makes the result missing; there is no partial
/// averaging across missing neighbors.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if x < 0.0 || y < 0.0 {
        return f32::NAN;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    if x0 >= width || y0 >= height {
        return f32::NAN;
    }
    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    // Zero-weight neighbors are never read, so a sample landing exactly
    // on a grid point is unaffected by a missing cell next door.
    let x1 = if xf == 0.0 { x0 } else { (x0 + 1).min(width - 1) };
    let y1 = if yf == 0.0 { y0 } else { (y0 + 1).min(height - 1) };

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let bottom = v00 * (1.0 - xf) + v10 * xf;
    let top = v01 * (1.0 - xf) + v11 * xf;
    bottom * (1.0 - yf) + top * yf
}

/// Interpolate with the configured method.
pub fn interpolate(
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    method: InterpolationMethod,
) -> f32 {
    match method {
        InterpolationMethod::Nearest => nearest_interpolate(data, width, height, x, y),
        InterpolationMethod::Bilinear => bilinear_interpolate(data, width, height, x, y),
    }
}

/// Ratio-based 1-D linear resampling of one grid row.
///
/// Used to bring the variable-length rows of a reduced grid to the
/// declared row length. Equal lengths copy directly.
pub fn resample_row(src: &[f32], dst_len: usize) -> Vec<f32> {
    if src.len() == dst_len {
        return src.to_vec();
    }
    if src.len() == 1 {
        return vec![src[0]; dst_len];
    }

    let scale = (src.len() - 1) as f64 / (dst_len.max(2) - 1) as f64;
    (0..dst_len)
        .map(|i| {
            let x = i as f64 * scale;
            let x0 = x.floor() as usize;
            let x1 = (x0 + 1).min(src.len() - 1);
            let frac = (x - x0 as f64) as f32;
            let a = src[x0];
            let b = src[x1];
            if a.is_nan() || b.is_nan() {
                f32::NAN
            } else {
                a * (1.0 - frac) + b * frac
            }
        })
        .collect()
}
