//! CPU implementation of the perspective warp composite.
//!
//! Horizontal scale interpolates linearly from 1.0 at the bottom of the
//! screen to 0.3 at the top, pulling content toward the horizontal center as
//! `v` rises; the same pass applies the trapezoid inset of the captured
//! quad's top edge. Sampling is nearest with clamp-to-edge, output is always
//! fully opaque.

use crate::error::{CinecrawlError, CinecrawlResult};

/// Horizontal scale factor at height `v` (`v = 0` bottom, `v = 1` top).
pub fn x_scale(v: f32) -> f32 {
    1.0 + v * (0.3 - 1.0)
}

/// Horizontal sample coordinate for screen coordinate `u` at height `v`.
pub fn warp_u(u: f32, v: f32) -> f32 {
    (u - 0.5) / x_scale(v) + 0.5
}

/// Warp a premultiplied RGBA8 buffer into the final opaque screen frame.
///
/// `top_inset_px` narrows the top edge of the source quad by that many pixels
/// per side, interpolated down to zero at the bottom edge; screen area the
/// quad no longer covers comes out opaque black. Rows and columns map to
/// normalized coordinates with exact endpoints, so the bottom row passes
/// through untouched and the top row sees the full 0.3 compression.
pub fn warp_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    top_inset_px: f32,
) -> CinecrawlResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CinecrawlError::render("warp buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(CinecrawlError::render(
            "warp_rgba8_premul expects src matching width*height*4",
        ));
    }
    if width == 0 || height == 0 {
        return Err(CinecrawlError::render("warp target must be non-empty"));
    }
    if !top_inset_px.is_finite() || top_inset_px < 0.0 {
        return Err(CinecrawlError::render(
            "warp top inset must be finite and >= 0",
        ));
    }

    let w = width as usize;
    let h = height as usize;
    let max_x = (width - 1) as f32;
    let mut out = vec![0u8; expected_len];

    for y in 0..h {
        let v = if h > 1 {
            (h - 1 - y) as f32 / (h - 1) as f32
        } else {
            0.0
        };
        let inset = top_inset_px * v;
        let span = max_x - 2.0 * inset;
        let row = y * w;

        for x in 0..w {
            let out_idx = (row + x) * 4;
            let xf = x as f32;

            if xf < inset || xf > max_x - inset {
                out[out_idx + 3] = 255;
                continue;
            }

            let u = if span > 0.0 { (xf - inset) / span } else { 0.5 };
            let sampled = warp_u(u, v).clamp(0.0, 1.0);
            let sx = ((sampled * max_x).round() as usize).min(w - 1);
            let src_idx = (row + sx) * 4;

            out[out_idx..out_idx + 3].copy_from_slice(&src[src_idx..src_idx + 3]);
            out[out_idx + 3] = 255;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn scale_interpolates_bottom_to_top() {
        assert!(close(x_scale(0.0), 1.0));
        assert!(close(x_scale(0.5), 0.65));
        assert!(close(x_scale(1.0), 0.3));
    }

    #[test]
    fn bottom_edge_is_undistorted() {
        for u in [0.0, 0.25, 0.5, 0.9, 1.0] {
            assert!(close(warp_u(u, 0.0), u));
        }
    }

    #[test]
    fn top_edge_compresses_toward_center() {
        assert!(close(warp_u(0.5, 1.0), 0.5));
        assert!(close(warp_u(0.65, 1.0), 1.0));
        assert!(close(warp_u(0.35, 1.0), 0.0));
        assert!(close(warp_u(0.0, 1.0), (0.0 - 0.5) / 0.3 + 0.5));
    }

    fn column_image(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0u8; (width * height * 4) as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let idx = (y * width as usize + x) * 4;
                data[idx] = (x * 10) as u8;
                data[idx + 1] = (y * 10) as u8;
                data[idx + 2] = 7;
                data[idx + 3] = 255;
            }
        }
        data
    }

    #[test]
    fn bottom_row_passes_through_opaque() {
        let src = column_image(5, 4);
        let out = warp_rgba8_premul(&src, 5, 4, 0.0).unwrap();
        let row = 3 * 5 * 4;
        for x in 0..5 {
            let idx = row + x * 4;
            assert_eq!(&out[idx..idx + 3], &src[idx..idx + 3]);
            assert_eq!(out[idx + 3], 255);
        }
    }

    #[test]
    fn top_row_resamples_toward_center() {
        let src = column_image(5, 4);
        let out = warp_rgba8_premul(&src, 5, 4, 0.0).unwrap();
        // u = x/4; warp_u(u, 1) clamps the outer columns to the edges and
        // keeps the center fixed: columns map to 0, 0, 2, 4, 4.
        let expect = [0usize, 0, 2, 4, 4];
        for (x, &sx) in expect.iter().enumerate() {
            let out_idx = x * 4;
            let src_idx = sx * 4;
            assert_eq!(&out[out_idx..out_idx + 3], &src[src_idx..src_idx + 3]);
        }
    }

    #[test]
    fn top_inset_blacks_out_the_corners() {
        let src = column_image(5, 2);
        let out = warp_rgba8_premul(&src, 5, 2, 1.0).unwrap();
        // Top row: columns 0 and 4 fall outside the inset quad.
        assert_eq!(&out[0..4], &[0, 0, 0, 255]);
        assert_eq!(&out[4 * 4..4 * 4 + 4], &[0, 0, 0, 255]);
        // Bottom row keeps its full width.
        let bottom = 5 * 4;
        assert_ne!(&out[bottom..bottom + 3], &[0, 0, 0]);
    }

    #[test]
    fn output_is_always_opaque() {
        let src = vec![0u8; 5 * 4 * 4];
        let out = warp_rgba8_premul(&src, 5, 4, 20.0).unwrap();
        for px in out.chunks_exact(4) {
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(warp_rgba8_premul(&[0u8; 12], 2, 2, 0.0).is_err());
        assert!(warp_rgba8_premul(&[0u8; 16], 2, 2, f32::NAN).is_err());
        assert!(warp_rgba8_premul(&[0u8; 16], 2, 2, -1.0).is_err());
    }
}
