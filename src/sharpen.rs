use crate::error::Result;
use crate::frame::{Dimensions, PixelBuffer, CHANNELS};

const KERNEL: [[i32; 3]; 3] = [
    [0, -1, 0],
    [-1, 5, -1],
    [0, -1, 0],
];

/// Applies the 3x3 sharpening kernel to the colour channels of `src`.
///
/// Samples outside the image reuse the nearest edge pixel. Alpha is copied
/// through untouched.
pub fn sharpen(src: &[u8], dims: Dimensions) -> Result<PixelBuffer> {
    dims.check_buffer(src)?;

    let w = dims.width() as i64;
    let h = dims.height() as i64;
    let mut dst = vec![0u8; src.len()];

    for y in 0..h {
        for x in 0..w {
            let out = ((y * w + x) as usize) * CHANNELS;
            for c in 0..3 {
                let mut sum = 0i32;
                for (ky, row) in KERNEL.iter().enumerate() {
                    let py = (y + ky as i64 - 1).clamp(0, h - 1);
                    for (kx, &weight) in row.iter().enumerate() {
                        if weight == 0 {
                            continue;
                        }
                        let px = (x + kx as i64 - 1).clamp(0, w - 1);
                        let idx = ((py * w + px) as usize) * CHANNELS + c;
                        sum += i32::from(src[idx]) * weight;
                    }
                }
                dst[out + c] = sum.clamp(0, 255) as u8;
            }
            dst[out + 3] = src[out + 3];
        }
    }

    Ok(dst)
}
