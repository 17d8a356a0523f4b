//! Packed ARGB pixel buffers

use crate::error::{Error, Result};

/// Fully transparent pixel used for void cells
pub const VOID_COLOR: u32 = 0x0000_0000;

/// Pack alpha, red, green and blue into `0xAARRGGBB`
#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Opaque gray pixel
#[inline]
pub fn pack_gray(gray: u8) -> u32 {
    pack_argb(255, gray, gray, gray)
}

/// Split `0xAARRGGBB` into `[a, r, g, b]`
#[inline]
pub fn unpack_argb(argb: u32) -> [u8; 4] {
    [
        (argb >> 24) as u8,
        (argb >> 16) as u8,
        (argb >> 8) as u8,
        argb as u8,
    ]
}

/// Row-major image of packed `0xAARRGGBB` pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgbImage {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl ArgbImage {
    /// Fully transparent image
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, VOID_COLOR)
    }

    /// Image with every pixel set to `argb`
    pub fn filled(width: usize, height: usize, argb: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![argb; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(Error::SizeMismatch {
                er: height,
                ec: width,
                ar: pixels.len() / width.max(1),
                ac: width,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at (row, col); `None` outside the image
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row < self.height && col < self.width {
            Some(self.pixels[row * self.width + col])
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, argb: u32) -> Result<()> {
        if row >= self.height || col >= self.width {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.height,
                cols: self.width,
            });
        }
        self.pixels[row * self.width + col] = argb;
        Ok(())
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u32> {
        self.pixels
    }

    /// Non-premultiplied RGBA bytes, row-major
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &p in &self.pixels {
            let [a, r, g, b] = unpack_argb(p);
            out.extend_from_slice(&[r, g, b, a]);
        }
        out
    }

    /// Composite `top` over this image with source-over alpha blending.
    pub fn composite_over(&mut self, top: &ArgbImage) -> Result<()> {
        if top.width != self.width || top.height != self.height {
            return Err(Error::SizeMismatch {
                er: self.height,
                ec: self.width,
                ar: top.height,
                ac: top.width,
            });
        }
        for (dst, &src) in self.pixels.iter_mut().zip(&top.pixels) {
            *dst = blend_over(*dst, src);
        }
        Ok(())
    }
}

fn blend_over(dst: u32, src: u32) -> u32 {
    let [sa, sr, sg, sb] = unpack_argb(src);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let [da, dr, dg, db] = unpack_argb(dst);
    let sa_f = sa as f32 / 255.0;
    let da_f = da as f32 / 255.0;
    let out_a = sa_f + da_f * (1.0 - sa_f);
    let channel = |s: u8, d: u8| {
        let v = (s as f32 * sa_f + d as f32 * da_f * (1.0 - sa_f)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    pack_argb(
        (out_a * 255.0).round() as u8,
        channel(sr, dr),
        channel(sg, dg),
        channel(sb, db),
    )
}
