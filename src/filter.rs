use crate::adam7::Pass;
use crate::reader::{ByteSink, Demand};
use crate::Error;
use std::convert::TryFrom;

/// Per-scanline predictor, stored as the first byte of every filtered line
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    /// In the order the min-sum heuristic tries them
    pub const ALL: [FilterType; 5] = [FilterType::None, FilterType::Sub, FilterType::Up, FilterType::Average, FilterType::Paeth];
}

impl TryFrom<u8> for FilterType {
    type Error = Error;

    #[inline]
    fn try_from(tag: u8) -> Result<Self, Error> {
        Ok(match tag {
            0 => FilterType::None,
            1 => FilterType::Sub,
            2 => FilterType::Up,
            3 => FilterType::Average,
            4 => FilterType::Paeth,
            _ => return Err(Error::new(36)),
        })
    }
}

/// How the encoder picks a filter for each scanline. Default: `MinSum`
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterStrategy {
    /// Use filter that gives minimum sum of absolute residuals, as described in the PNG filter heuristic.
    /// The lowest numbered filter wins ties.
    MinSum,
    /// Same filter for every line
    Fixed(FilterType),
}

impl Default for FilterStrategy {
    fn default() -> Self {
        FilterStrategy::MinSum
    }
}

/// Picks whichever of left, above and upper-left is closest to `left + above - upleft`.
///
/// Ties go to left, then above.
#[inline]
#[must_use]
pub fn paeth_predictor(left: u8, above: u8, upleft: u8) -> u8 {
    let (a, b, c) = (i16::from(left), i16::from(above), i16::from(upleft));
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upleft
    }
}

/// Reverses the filter of one scanline. `stride` is the distance in bytes to the corresponding byte of the pixel on the left.
///
/// `out` and `raw` have the same length (without the filter type byte). `prevline` is the unfiltered line above, if any.
pub fn unfilter_scanline(out: &mut [u8], raw: &[u8], prevline: Option<&[u8]>, stride: usize, filter: FilterType) {
    let length = out.len();
    debug_assert_eq!(raw.len(), length);
    let stride = stride.min(length);
    match filter {
        FilterType::None => out.copy_from_slice(raw),
        FilterType::Sub => {
            out[..stride].copy_from_slice(&raw[..stride]);
            for i in stride..length {
                out[i] = raw[i].wrapping_add(out[i - stride]);
            }
        },
        FilterType::Up => if let Some(prevline) = prevline {
            for i in 0..length {
                out[i] = raw[i].wrapping_add(prevline[i]);
            }
        } else {
            out.copy_from_slice(raw);
        },
        FilterType::Average => if let Some(prevline) = prevline {
            for i in 0..stride {
                out[i] = raw[i].wrapping_add(prevline[i] >> 1);
            }
            for i in stride..length {
                let avg = (u16::from(out[i - stride]) + u16::from(prevline[i])) >> 1;
                out[i] = raw[i].wrapping_add(avg as u8);
            }
        } else {
            out[..stride].copy_from_slice(&raw[..stride]);
            for i in stride..length {
                out[i] = raw[i].wrapping_add(out[i - stride] >> 1);
            }
        },
        FilterType::Paeth => if let Some(prevline) = prevline {
            for i in 0..stride {
                /*paeth_predictor(0, prevline[i], 0) is always prevline[i]*/
                out[i] = raw[i].wrapping_add(prevline[i]);
            }
            for i in stride..length {
                out[i] = raw[i].wrapping_add(paeth_predictor(out[i - stride], prevline[i], prevline[i - stride]));
            }
        } else {
            out[..stride].copy_from_slice(&raw[..stride]);
            for i in stride..length {
                /*paeth_predictor(out[i - stride], 0, 0) is always out[i - stride]*/
                out[i] = raw[i].wrapping_add(out[i - stride]);
            }
        },
    }
}

/// Applies a filter to one scanline. Predictions always use the unfiltered `scanline` and `prevline`.
pub fn filter_scanline(out: &mut [u8], scanline: &[u8], prevline: Option<&[u8]>, stride: usize, filter: FilterType) {
    let length = scanline.len();
    debug_assert_eq!(out.len(), length);
    let stride = stride.min(length);
    match filter {
        FilterType::None => out.copy_from_slice(scanline),
        FilterType::Sub => {
            out[..stride].copy_from_slice(&scanline[..stride]);
            for i in stride..length {
                out[i] = scanline[i].wrapping_sub(scanline[i - stride]);
            }
        },
        FilterType::Up => if let Some(prevline) = prevline {
            for i in 0..length {
                out[i] = scanline[i].wrapping_sub(prevline[i]);
            }
        } else {
            out.copy_from_slice(scanline);
        },
        FilterType::Average => if let Some(prevline) = prevline {
            for i in 0..stride {
                out[i] = scanline[i].wrapping_sub(prevline[i] >> 1);
            }
            for i in stride..length {
                let avg = (u16::from(scanline[i - stride]) + u16::from(prevline[i])) >> 1;
                out[i] = scanline[i].wrapping_sub(avg as u8);
            }
        } else {
            out[..stride].copy_from_slice(&scanline[..stride]);
            for i in stride..length {
                out[i] = scanline[i].wrapping_sub(scanline[i - stride] >> 1);
            }
        },
        FilterType::Paeth => if let Some(prevline) = prevline {
            for i in 0..stride {
                out[i] = scanline[i].wrapping_sub(prevline[i]);
            }
            for i in stride..length {
                out[i] = scanline[i].wrapping_sub(paeth_predictor(scanline[i - stride], prevline[i], prevline[i - stride]));
            }
        } else {
            out[..stride].copy_from_slice(&scanline[..stride]);
            for i in stride..length {
                out[i] = scanline[i].wrapping_sub(scanline[i - stride]);
            }
        },
    }
}

/// Cost of a filter for the min-sum heuristic: sum of absolute differences between each byte and its prediction.
/// The differences are not wrapped to a byte, so e.g. 0 predicted as 255 costs 255.
#[must_use]
pub fn filter_cost(scanline: &[u8], prevline: Option<&[u8]>, stride: usize, filter: FilterType) -> u64 {
    let up = |i: usize| prevline.map_or(0, |p| i32::from(p[i]));
    let left = |i: usize| if i >= stride { i32::from(scanline[i - stride]) } else { 0 };
    let upleft = |i: usize| match prevline {
        Some(p) if i >= stride => p[i - stride],
        _ => 0,
    };
    let predict = |i: usize| -> i32 {
        match filter {
            FilterType::None => 0,
            FilterType::Sub => left(i),
            FilterType::Up => up(i),
            FilterType::Average => (left(i) + up(i)) >> 1,
            FilterType::Paeth => i32::from(paeth_predictor(left(i) as u8, up(i) as u8, upleft(i))),
        }
    };
    scanline.iter().enumerate()
        .map(|(i, &b)| u64::from((i32::from(b) - predict(i)).unsigned_abs()))
        .sum()
}

/// Filter for the line according to the strategy
#[must_use]
pub fn choose_filter(scanline: &[u8], prevline: Option<&[u8]>, stride: usize, strategy: FilterStrategy) -> FilterType {
    match strategy {
        FilterStrategy::Fixed(f) => f,
        FilterStrategy::MinSum => {
            let mut best = FilterType::None;
            let mut min = u64::MAX;
            for &f in &FilterType::ALL {
                let cost = filter_cost(scanline, prevline, stride, f);
                if cost < min {
                    best = f;
                    min = cost;
                }
            }
            best
        },
    }
}

/// Filters a whole non-interlaced image of byte-aligned lines, appending `[filter type, filtered bytes...]` per line to `out`.
pub fn filter_image(out: &mut Vec<u8>, image: &[u8], line_bytes: usize, stride: usize, strategy: FilterStrategy) -> Result<(), Error> {
    if line_bytes == 0 {
        return Ok(());
    }
    let height = image.len() / line_bytes;
    out.try_reserve(height * (line_bytes + 1))?;

    let mut prevline = None;
    let mut filtered = vec![0u8; line_bytes];
    for line in image.chunks_exact(line_bytes) {
        let filter = choose_filter(line, prevline, stride, strategy);
        filter_scanline(&mut filtered, line, prevline, stride, filter);
        out.push(filter as u8);
        out.extend_from_slice(&filtered);
        prevline = Some(line);
    }
    Ok(())
}

/// Receives unfiltered scanlines, in stream order
pub trait RowSink {
    /// `y` is the line number within the pass. The row has no filter byte.
    fn write_row(&mut self, pass: &Pass, y: u32, row: &[u8]) -> Result<(), Error>;
}

/// Scanline decoder state: demands one filtered line at a time, through all passes, and hands unfiltered lines to a [`RowSink`].
pub struct Unfilter<S> {
    passes: Vec<Pass>,
    bits_per_pixel: usize,
    stride: usize,
    /// always points at a non-empty pass, or past the end when done
    pass_index: usize,
    line: u32,
    has_prev: bool,
    prevline: Vec<u8>,
    curline: Vec<u8>,
    sink: S,
}

impl<S: RowSink> Unfilter<S> {
    /// `bits_per_pixel` is channels × bit depth. Stride to the left pixel is whole bytes per pixel, or 1 for sub-byte pixels.
    pub fn new(passes: Vec<Pass>, bits_per_pixel: usize, sink: S) -> Self {
        let mut u = Self {
            passes,
            bits_per_pixel,
            stride: (bits_per_pixel / 8).max(1),
            pass_index: 0,
            line: 0,
            has_prev: false,
            prevline: Vec::new(),
            curline: Vec::new(),
            sink,
        };
        u.skip_empty_passes();
        u
    }

    fn skip_empty_passes(&mut self) {
        while self.passes.get(self.pass_index).map_or(false, |p| p.is_empty()) {
            self.pass_index += 1;
        }
        if let Some(pass) = self.passes.get(self.pass_index) {
            let len = pass.line_bytes(self.bits_per_pixel);
            self.prevline.clear();
            self.prevline.resize(len, 0);
            self.curline.clear();
            self.curline.resize(len, 0);
        }
        self.line = 0;
        self.has_prev = false;
    }

    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pass_index >= self.passes.len()
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: RowSink> ByteSink for Unfilter<S> {
    fn demand(&self) -> Option<Demand> {
        self.passes.get(self.pass_index).map(|p| Demand::Exact(p.line_bytes(self.bits_per_pixel) + 1))
    }

    fn supply(&mut self, data: &[u8]) -> Result<(), Error> {
        let pass = match self.passes.get(self.pass_index) {
            Some(&p) => p,
            None => return Err(Error::new(111)),
        };
        let filter = FilterType::try_from(data[0])?;
        let prevline = if self.has_prev { Some(&self.prevline[..]) } else { None };
        unfilter_scanline(&mut self.curline, &data[1..], prevline, self.stride, filter);
        self.sink.write_row(&pass, self.line, &self.curline)?;

        std::mem::swap(&mut self.prevline, &mut self.curline);
        self.has_prev = true;
        self.line += 1;
        if self.line >= pass.height {
            self.pass_index += 1;
            self.skip_empty_passes();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adam7;
    use crate::reader::process_buffered;

    #[test]
    fn test_filter() {
        let mut line1 = Vec::with_capacity(1 << 16);
        let mut line2 = Vec::with_capacity(1 << 16);
        for p in 0..256 {
            for q in 0..256 {
                line1.push(q as u8);
                line2.push(p as u8);
            }
        }

        let mut filtered = vec![99u8; 1 << 16];
        let mut unfiltered = vec![66u8; 1 << 16];
        for &stride in &[1, 3, 4, 8] {
            for &filter_type in &FilterType::ALL {
                filter_scanline(&mut filtered, &line1, Some(&line2), stride, filter_type);
                unfilter_scanline(&mut unfiltered, &filtered, Some(&line2), stride, filter_type);
                assert_eq!(unfiltered, line1, "prev+filter={:?} stride={}", filter_type, stride);
            }
            for &filter_type in &FilterType::ALL {
                filter_scanline(&mut filtered, &line1, None, stride, filter_type);
                unfilter_scanline(&mut unfiltered, &filtered, None, stride, filter_type);
                assert_eq!(unfiltered, line1, "none+filter={:?} stride={}", filter_type, stride);
            }
        }
    }

    #[test]
    fn paeth_tie_breaks() {
        // all equal distances: left wins
        assert_eq!(paeth_predictor(10, 10, 10), 10);
        // p = 2; left and upleft are both 2 away: left wins
        assert_eq!(paeth_predictor(0, 6, 4), 0);
        // p = 7; above and upleft are both 1 away: above wins
        assert_eq!(paeth_predictor(5, 8, 6), 8);
        // p = 5 + 7 - 6 = 6; above is 1 away, upleft is 0 away
        assert_eq!(paeth_predictor(5, 7, 6), 6);
        // p = 0 + 4 - 2 = 2; left 2, above 2, upleft 0
        assert_eq!(paeth_predictor(0, 4, 2), 2);
        // p = 9 + 3 - 0 = 12; left 3, above 9, upleft 12
        assert_eq!(paeth_predictor(9, 3, 0), 9);
        // p = 3 + 9 - 0 = 12; left 9, above 3, upleft 12
        assert_eq!(paeth_predictor(3, 9, 0), 9);
    }

    #[test]
    fn paeth_returns_an_input() {
        for a in (0..=255u8).step_by(5) {
            for b in (0..=255u8).step_by(3) {
                for c in (0..=255u8).step_by(7) {
                    let p = paeth_predictor(a, b, c);
                    assert!(p == a || p == b || p == c);
                    assert_eq!(p, paeth_predictor(a, b, c));
                }
            }
        }
    }

    #[test]
    fn invalid_filter_tag() {
        assert_eq!(FilterType::try_from(5).unwrap_err().kind(), crate::ErrorKind::Format);
        assert_eq!(FilterType::try_from(4).unwrap(), FilterType::Paeth);
    }

    #[test]
    fn min_sum_costs() {
        let line = [200u8, 201, 202, 203];
        // None: raw byte values
        assert_eq!(filter_cost(&line, None, 1, FilterType::None), 806);
        // Sub: 200 + 1 + 1 + 1
        assert_eq!(filter_cost(&line, None, 1, FilterType::Sub), 203);
        assert_eq!(choose_filter(&line, None, 1, FilterStrategy::MinSum), FilterType::Sub);
        // Sub and Paeth are equal without a line above; the lower number wins
        assert_eq!(filter_cost(&line, None, 1, FilterType::Paeth), 203);

        let prev = [200u8, 201, 202, 203];
        assert_eq!(filter_cost(&line, Some(&prev), 1, FilterType::Up), 0);
        assert_eq!(choose_filter(&line, Some(&prev), 1, FilterStrategy::MinSum), FilterType::Up);
        assert_eq!(choose_filter(&line, Some(&prev), 1, FilterStrategy::Fixed(FilterType::Average)), FilterType::Average);

        // all zeros: None costs 0 and nothing beats it strictly
        assert_eq!(choose_filter(&[0; 8], Some(&[0; 8]), 1, FilterStrategy::MinSum), FilterType::None);
    }

    #[test]
    fn cost_is_not_wrapped() {
        // 0 predicted from 255 on the left: residual is -255, not 1
        assert_eq!(filter_cost(&[255, 0], None, 1, FilterType::Sub), 255 + 255);
    }

    #[test]
    fn filter_image_lines() {
        let image = [1u8, 2, 3, 1, 2, 3];
        let mut out = Vec::new();
        filter_image(&mut out, &image, 3, 1, FilterStrategy::Fixed(FilterType::Up)).unwrap();
        assert_eq!(out, [2, 1, 2, 3, 2, 0, 0, 0]);
    }

    struct Rows(Vec<(u8, u32, Vec<u8>)>);

    impl RowSink for Rows {
        fn write_row(&mut self, pass: &Pass, y: u32, row: &[u8]) -> Result<(), Error> {
            self.0.push((pass.index, y, row.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn unfilter_resets_between_passes() {
        // 2x2 8-bit grey, interlaced: passes 0, 5 and 6 are non-empty with 1, 1 and 2 pixels
        let passes = adam7::passes(2, 2, true);
        let data = [
            2, 10, // pass 0, Up without a line above is a copy
            2, 20, // pass 5, must not add pass 0's line
            1, 30, 5, // pass 6, Sub
        ];
        let mut u = Unfilter::new(passes, 8, Rows(Vec::new()));
        process_buffered(&data, &mut u).unwrap();
        assert!(u.is_complete());
        let rows = u.into_sink().0;
        assert_eq!(rows, vec![(0, 0, vec![10]), (5, 0, vec![20]), (6, 0, vec![30, 35])]);
    }

    #[test]
    fn unfilter_uses_previous_line() {
        let passes = adam7::passes(2, 2, false);
        let data = [0, 1, 2, 2, 1, 1];
        let mut u = Unfilter::new(passes, 8, Rows(Vec::new()));
        process_buffered(&data, &mut u).unwrap();
        let rows = u.into_sink().0;
        assert_eq!(rows[1], (0, 1, vec![2, 3]));
    }

    #[test]
    fn unfilter_sixteen_bit_stride() {
        // one 16-bit grey-alpha line of 2 pixels: 4 bytes per pixel
        let passes = adam7::passes(2, 1, false);
        let data = [1, 1, 2, 3, 4, 1, 1, 1, 1];
        let mut u = Unfilter::new(passes, 32, Rows(Vec::new()));
        process_buffered(&data, &mut u).unwrap();
        assert_eq!(u.into_sink().0[0].2, vec![1, 2, 3, 4, 2, 3, 4, 5]);
    }

    #[test]
    fn unfilter_bad_tag() {
        let passes = adam7::passes(1, 1, false);
        let mut u = Unfilter::new(passes, 8, Rows(Vec::new()));
        let err = process_buffered(&[7, 0], &mut u).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Format);
    }
}
