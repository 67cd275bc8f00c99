use crate::detection::infrastructure::math::{sample_bilinear, Affine};
use crate::shared::frame::{Frame, CHANNELS};

/// Blends an aligned square crop back into the frame it was cut from.
///
/// `to_crop` maps frame coordinates to crop coordinates (the same transform
/// used to cut the crop). Only frame pixels whose preimage lands inside the
/// crop are touched. The blend weight ramps from 0 at the crop border to 1
/// at `size / 8` pixels inside it, so the swapped face has no hard seam.
pub fn paste_back(frame: &Frame, crop: &[u8], size: usize, to_crop: &Affine) -> Option<Frame> {
    let from_crop = to_crop.invert()?;
    let edge = (size - 1) as f64;
    let margin = size as f64 / 16.0;

    let (x0, y0, x1, y1) = footprint(&from_crop, edge, frame.width(), frame.height())?;

    let width = frame.width() as usize;
    let mut out = frame.clone();
    let data = out.data_mut();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (u, v) = to_crop.apply(x as f64, y as f64);
            let Some(rgb) = sample_bilinear(crop, size, size, u, v) else {
                continue;
            };
            let distance = u.min(v).min(edge - u).min(edge - v);
            let weight = ((distance - margin) / margin).clamp(0.0, 1.0);
            if weight <= 0.0 {
                continue;
            }
            let offset = (y * width + x) * CHANNELS;
            for c in 0..CHANNELS {
                let original = data[offset + c] as f64;
                let blended = weight * rgb[c] + (1.0 - weight) * original;
                data[offset + c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Some(out)
}

/// Frame-space bounding box of the crop square, clipped to the frame.
fn footprint(
    from_crop: &Affine,
    edge: f64,
    width: u32,
    height: u32,
) -> Option<(usize, usize, usize, usize)> {
    if width == 0 || height == 0 {
        return None;
    }
    let corners = [(0.0, 0.0), (edge, 0.0), (0.0, edge), (edge, edge)].map(|(u, v)| from_crop.apply(u, v));
    let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min).floor();
    let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max).ceil();
    let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min).floor();
    let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max).ceil();

    let max_w = (width - 1) as f64;
    let max_h = (height - 1) as f64;
    if max_x < 0.0 || max_y < 0.0 || min_x > max_w || min_y > max_h {
        return None;
    }
    Some((
        min_x.max(0.0) as usize,
        min_y.max(0.0) as usize,
        max_x.min(max_w) as usize,
        max_y.min(max_h) as usize,
    ))
}
