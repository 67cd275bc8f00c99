//! Landmark alignment: similarity-transform estimation and affine warping.
//!
//! Both the embedding model and the swap model expect faces aligned to the
//! ArcFace five-point template.

use crate::shared::frame::{Frame, CHANNELS};

/// ArcFace landmark template for a 112x112 crop.
const ARCFACE_TEMPLATE_112: [(f64, f64); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// 2x3 affine matrix mapping `(x, y)` to `(a*x + b*y + c, d*x + e*y + f)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub m: [[f64; 3]; 2],
}

impl Affine {
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        (
            m[0][0] * x + m[0][1] * y + m[0][2],
            m[1][0] * x + m[1][1] * y + m[1][2],
        )
    }

    /// Inverse transform, or `None` for a degenerate matrix.
    pub fn invert(&self) -> Option<Affine> {
        let [[a, b, c], [d, e, f]] = self.m;
        let det = a * e - b * d;
        if det.abs() < 1e-12 {
            return None;
        }
        let ia = e / det;
        let ib = -b / det;
        let id = -d / det;
        let ie = a / det;
        Some(Affine {
            m: [
                [ia, ib, -(ia * c + ib * f)],
                [id, ie, -(id * c + ie * f)],
            ],
        })
    }
}

/// ArcFace template scaled for a square crop of `size` pixels.
///
/// Sizes that are multiples of 112 scale the template; others scale by
/// `size / 128` and shift right by 8 scaled pixels.
pub fn arcface_template(size: usize) -> [(f64, f64); 5] {
    let (ratio, diff_x) = if size % 112 == 0 {
        (size as f64 / 112.0, 0.0)
    } else {
        let ratio = size as f64 / 128.0;
        (ratio, 8.0 * ratio)
    };
    ARCFACE_TEMPLATE_112.map(|(x, y)| (x * ratio + diff_x, y * ratio))
}

/// Least-squares similarity transform (rotation, uniform scale, translation)
/// taking `src` points onto `dst` points.
pub fn estimate_similarity(src: &[(f64, f64); 5], dst: &[(f64, f64); 5]) -> Option<Affine> {
    let n = src.len() as f64;
    let (sx, sy) = centroid(src);
    let (dx, dy) = centroid(dst);

    let mut num_a = 0.0;
    let mut num_b = 0.0;
    let mut denom = 0.0;
    for (s, d) in src.iter().zip(dst.iter()) {
        let (px, py) = (s.0 - sx, s.1 - sy);
        let (qx, qy) = (d.0 - dx, d.1 - dy);
        num_a += px * qx + py * qy;
        num_b += px * qy - py * qx;
        denom += px * px + py * py;
    }
    if denom / n < 1e-12 {
        return None;
    }

    let a = num_a / denom;
    let b = num_b / denom;
    Some(Affine {
        m: [
            [a, -b, dx - (a * sx - b * sy)],
            [b, a, dy - (b * sx + a * sy)],
        ],
    })
}

fn centroid(points: &[(f64, f64); 5]) -> (f64, f64) {
    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
    (sum_x / n, sum_y / n)
}

/// Warps `frame` into a `width` x `height` RGB buffer, where `transform`
/// maps frame coordinates to output coordinates. Out-of-frame samples are black.
pub fn warp_affine(frame: &Frame, transform: &Affine, width: usize, height: usize) -> Option<Vec<u8>> {
    let inverse = transform.invert()?;
    let mut out = vec![0u8; width * height * CHANNELS];
    for v in 0..height {
        for u in 0..width {
            let (x, y) = inverse.apply(u as f64, v as f64);
            if let Some(rgb) = sample_bilinear(
                frame.data(),
                frame.width() as usize,
                frame.height() as usize,
                x,
                y,
            ) {
                let offset = (v * width + u) * CHANNELS;
                for c in 0..CHANNELS {
                    out[offset + c] = rgb[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
    Some(out)
}

/// Bilinear sample of an RGB buffer at a fractional position.
///
/// Returns `None` when the position falls outside the image.
pub fn sample_bilinear(data: &[u8], width: usize, height: usize, x: f64, y: f64) -> Option<[f64; 3]> {
    if width == 0 || height == 0 || x < 0.0 || y < 0.0 {
        return None;
    }
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;
    if x > max_x || y > max_y {
        return None;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let at = |px: usize, py: usize, c: usize| data[(py * width + px) * CHANNELS + c] as f64;
    let mut rgb = [0.0; 3];
    for (c, value) in rgb.iter_mut().enumerate() {
        let top = at(x0, y0, c) * (1.0 - fx) + at(x1, y0, c) * fx;
        let bottom = at(x0, y1, c) * (1.0 - fx) + at(x1, y1, c) * fx;
        *value = top * (1.0 - fy) + bottom * fy;
    }
    Some(rgb)
}
