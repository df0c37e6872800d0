/*shared values used by the Adam7 pass geometry*/
/*x start values*/
pub const ADAM7_IX: [u32; 7] = [0, 4, 0, 2, 0, 1, 0];
/*y start values*/
pub const ADAM7_IY: [u32; 7] = [0, 0, 4, 0, 2, 0, 1];
/*x delta values*/
pub const ADAM7_DX: [u32; 7] = [8, 8, 4, 4, 2, 2, 1];
/*y delta values*/
pub const ADAM7_DY: [u32; 7] = [8, 8, 8, 4, 4, 2, 2];

/// One sub-image of an interlaced image, or the whole image when not interlaced
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pass {
    /// 0-6 for Adam7, always 0 for non-interlaced
    pub index: u8,
    pub x0: u32,
    pub y0: u32,
    pub dx: u32,
    pub dy: u32,
    /// in pixels, 0 if the pass is empty
    pub width: u32,
    pub height: u32,
}

impl Pass {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes in one scanline of this pass, excluding the filter type byte
    #[inline]
    #[must_use]
    pub fn line_bytes(&self, bits_per_pixel: usize) -> usize {
        (self.width as usize * bits_per_pixel + 7) / 8
    }

    /// Bytes of filtered data for this pass, including a filter byte per line
    #[inline]
    #[must_use]
    pub fn filtered_size(&self, bits_per_pixel: usize) -> usize {
        if self.is_empty() {
            0
        } else {
            self.height as usize * (1 + self.line_bytes(bits_per_pixel))
        }
    }
}

/// Pass geometry in decoding order.
///
/// Interlaced images always get all 7 passes, including empty ones, so that pass indices stay stable.
#[must_use]
pub fn passes(w: u32, h: u32, interlaced: bool) -> Vec<Pass> {
    if !interlaced {
        return vec![Pass { index: 0, x0: 0, y0: 0, dx: 1, dy: 1, width: w, height: h }];
    }
    (0..7).map(|i| {
        /*u64 so that sizes near u32::MAX don't overflow; the result is never larger than w or h*/
        let mut width = ((u64::from(w) + u64::from(ADAM7_DX[i] - ADAM7_IX[i]) - 1) / u64::from(ADAM7_DX[i])) as u32;
        let mut height = ((u64::from(h) + u64::from(ADAM7_DY[i] - ADAM7_IY[i]) - 1) / u64::from(ADAM7_DY[i])) as u32;
        if width == 0 {
            height = 0;
        }
        if height == 0 {
            width = 0;
        }
        Pass {
            index: i as u8,
            x0: ADAM7_IX[i],
            y0: ADAM7_IY[i],
            dx: ADAM7_DX[i],
            dy: ADAM7_DY[i],
            width,
            height,
        }
    }).collect()
}

/// Index of the first of 4 channel samples, in a canonical buffer of the full image, for pixel (x, y) of the pass
#[inline]
#[must_use]
pub fn pixel_offset(image_width: u32, pass: &Pass, x: u32, y: u32) -> usize {
    let full_x = (pass.x0 + x * pass.dx) as usize;
    let full_y = (pass.y0 + y * pass.dy) as usize;
    (full_y * image_width as usize + full_x) * 4
}

/// Size of all filtered image data, including filter bytes
#[must_use]
pub fn filtered_size(w: u32, h: u32, interlaced: bool, bits_per_pixel: usize) -> usize {
    passes(w, h, interlaced).iter().map(|p| p.filtered_size(bits_per_pixel)).sum()
}
