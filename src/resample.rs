use crate::error::Result;
use crate::frame::{Dimensions, PixelBuffer, ScaleFactor, CHANNELS};

/// Bilinearly resamples an RGBA buffer from `src_dims` to `dst_dims`.
///
/// Neighbours past the last column or row are clamped to the edge, so the
/// output is always exactly `dst_dims.buffer_len()` bytes.
pub fn resample_bilinear(src: &[u8], src_dims: Dimensions, dst_dims: Dimensions) -> Result<PixelBuffer> {
    src_dims.check_buffer(src)?;

    let (sw, sh) = (src_dims.width() as usize, src_dims.height() as usize);
    let (dw, dh) = (dst_dims.width() as usize, dst_dims.height() as usize);
    let x_ratio = sw as f64 / dw as f64;
    let y_ratio = sh as f64 / dh as f64;

    let mut dst = vec![0u8; dst_dims.buffer_len()];

    for i in 0..dh {
        let y = i as f64 * y_ratio;
        let y1 = (y.floor() as usize).min(sh - 1);
        let y2 = (y1 + 1).min(sh - 1);
        let dy = y - y1 as f64;

        for j in 0..dw {
            let x = j as f64 * x_ratio;
            let x1 = (x.floor() as usize).min(sw - 1);
            let x2 = (x1 + 1).min(sw - 1);
            let dx = x - x1 as f64;

            let p1 = (y1 * sw + x1) * CHANNELS;
            let p2 = (y1 * sw + x2) * CHANNELS;
            let p3 = (y2 * sw + x1) * CHANNELS;
            let p4 = (y2 * sw + x2) * CHANNELS;
            let out = (i * dw + j) * CHANNELS;

            for c in 0..CHANNELS {
                let value = f64::from(src[p1 + c]) * (1.0 - dx) * (1.0 - dy)
                    + f64::from(src[p2 + c]) * dx * (1.0 - dy)
                    + f64::from(src[p3 + c]) * (1.0 - dx) * dy
                    + f64::from(src[p4 + c]) * dx * dy;
                dst[out + c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Ok(dst)
}

/// Enlarges `src` by `scale`, returning the new buffer and its dimensions.
pub fn upscale(src: &[u8], src_dims: Dimensions, scale: ScaleFactor) -> Result<(PixelBuffer, Dimensions)> {
    let dst_dims = src_dims.scaled(scale)?;
    let dst = resample_bilinear(src, src_dims, dst_dims)?;
    Ok((dst, dst_dims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        let mut buf = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                buf.extend_from_slice(&[(x * 37 % 256) as u8, (y * 53 % 256) as u8, ((x + y) * 11 % 256) as u8, 200]);
            }
        }
        buf
    }

    #[test]
    fn uniform_red_stays_uniform_when_doubled() {
        let src = [255u8, 0, 0, 255].repeat(4);
        let (out, out_dims) = upscale(&src, dims(2, 2), ScaleFactor::new(2).unwrap()).unwrap();
        assert_eq!(out_dims, dims(4, 4));
        assert_eq!(out, [255u8, 0, 0, 255].repeat(16));
    }

    #[test]
    fn output_length_matches_destination_for_mixed_sizes() {
        let cases = [(1, 1, 3, 2), (3, 5, 7, 11), (8, 4, 2, 2), (5, 5, 5, 1), (2, 3, 8, 12)];
        for (sw, sh, dw, dh) in cases {
            let src = gradient(sw, sh);
            let out = resample_bilinear(&src, dims(sw, sh), dims(dw, dh)).unwrap();
            assert_eq!(out.len(), (dw * dh * 4) as usize, "{}x{} -> {}x{}", sw, sh, dw, dh);
        }
    }

    #[test]
    fn same_size_resample_is_identity() {
        let src = gradient(6, 4);
        let out = resample_bilinear(&src, dims(6, 4), dims(6, 4)).unwrap();
        for (a, b) in src.iter().zip(out.iter()) {
            assert!((i16::from(*a) - i16::from(*b)).abs() <= 1);
        }
    }

    #[test]
    fn doubling_interpolates_between_neighbours() {
        // one row: black then white
        let src = vec![0, 0, 0, 255, 200, 200, 200, 255];
        let out = resample_bilinear(&src, dims(2, 1), dims(4, 1)).unwrap();
        let reds: Vec<u8> = out.chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(reds, vec![0, 100, 200, 200]);
        assert!(out.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn mismatched_source_length_fails_fast() {
        let src = vec![0u8; 15];
        let err = resample_bilinear(&src, dims(2, 2), dims(4, 4)).unwrap_err();
        assert!(matches!(err, Error::FrameFormat(_)));
    }
}
