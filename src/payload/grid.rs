//! Grid and Image - padded rasters over a region.
//!
//! Rows run north to south. The pad is a border of extra nodes around the
//! visible area; widening it narrows the visible area without moving data,
//! which is how reference imports expose a subregion.

use crate::core::Region;
use crate::util::{Error, Result};

/// Node registration of a raster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Registration {
    #[default]
    Gridline,
    Pixel,
}

/// Pad order: west, east, south, north.
pub type Pad = [usize; 4];

const XLO: usize = 0;
const XHI: usize = 1;
const YLO: usize = 2;
const YHI: usize = 3;

/// Shape and placement of a raster.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridHeader {
    pub region: Region,
    /// x and y increments
    pub inc: [f64; 2],
    pub registration: Registration,
    pub n_columns: usize,
    pub n_rows: usize,
    pub pad: Pad,
    pub title: String,
}

impl GridHeader {
    /// Header for `region` at `inc`, with node counts derived from the registration.
    pub fn new(region: Region, inc: [f64; 2], registration: Registration, pad: usize) -> Result<Self> {
        if !region.is_valid() || inc[0] <= 0.0 || inc[1] <= 0.0 {
            return Err(Error::OutsideDomain(format!("bad region {region} or increment {inc:?}")));
        }
        let offset = match registration {
            Registration::Gridline => 1,
            Registration::Pixel => 0,
        };
        let n_columns = (region.width() / inc[0]).round() as usize + offset;
        let n_rows = (region.height() / inc[1]).round() as usize + offset;
        Ok(Self {
            region,
            inc,
            registration,
            n_columns,
            n_rows,
            pad: [pad; 4],
            title: String::new(),
        })
    }

    /// Padded width.
    #[inline]
    pub fn mx(&self) -> usize {
        self.n_columns + self.pad[XLO] + self.pad[XHI]
    }

    /// Padded height.
    #[inline]
    pub fn my(&self) -> usize {
        self.n_rows + self.pad[YLO] + self.pad[YHI]
    }

    /// Number of nodes including the pad.
    #[inline]
    pub fn size(&self) -> usize {
        self.mx() * self.my()
    }

    /// Storage index of visible node (`row`, `col`).
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        (row + self.pad[YHI]) * self.mx() + col + self.pad[XLO]
    }

    fn half_pixel(&self) -> f64 {
        match self.registration {
            Registration::Gridline => 0.0,
            Registration::Pixel => 0.5,
        }
    }

    /// x coordinate of column `col`.
    pub fn x(&self, col: usize) -> f64 {
        self.region.west + (col as f64 + self.half_pixel()) * self.inc[0]
    }

    /// y coordinate of row `row`.
    pub fn y(&self, row: usize) -> f64 {
        self.region.north - (row as f64 + self.half_pixel()) * self.inc[1]
    }

    /// Node offsets (w, e, s, n) that trim this header to `sub`.
    fn trim_offsets(&self, sub: &Region) -> Result<[usize; 4]> {
        let tol = 0.5 * self.inc[0].min(self.inc[1]);
        if !self.region.contains(sub, tol) || !sub.is_valid() {
            return Err(Error::OutsideDomain(format!("{sub} not inside {}", self.region)));
        }
        let steps = |d: f64, inc: f64| (d / inc).round().max(0.0) as usize;
        let w = steps(sub.west - self.region.west, self.inc[0]);
        let e = steps(self.region.east - sub.east, self.inc[0]);
        let s = steps(sub.south - self.region.south, self.inc[1]);
        let n = steps(self.region.north - sub.north, self.inc[1]);
        if w + e >= self.n_columns || s + n >= self.n_rows {
            return Err(Error::OutsideDomain(format!("{sub} leaves no nodes")));
        }
        Ok([w, e, s, n])
    }

    /// Same storage, visible area trimmed to `sub` by widening the pad.
    pub fn narrowed(&self, sub: &Region) -> Result<GridHeader> {
        let [w, e, s, n] = self.trim_offsets(sub)?;
        let mut h = self.clone();
        h.pad[XLO] += w;
        h.pad[XHI] += e;
        h.pad[YLO] += s;
        h.pad[YHI] += n;
        h.n_columns -= w + e;
        h.n_rows -= s + n;
        h.region = Region::new(
            self.region.west + w as f64 * self.inc[0],
            self.region.east - e as f64 * self.inc[0],
            self.region.south + s as f64 * self.inc[1],
            self.region.north - n as f64 * self.inc[1],
        );
        Ok(h)
    }

    /// Header of a fresh raster covering `sub`, plus the (w, n) node offsets into this one.
    fn extracted(&self, sub: &Region, pad: usize) -> Result<(GridHeader, usize, usize)> {
        let narrowed = self.narrowed(sub)?;
        let [w, _, _, n] = self.trim_offsets(sub)?;
        let mut h = narrowed;
        h.pad = [pad; 4];
        Ok((h, w, n))
    }
}

/// Single-band raster of floats.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    pub header: GridHeader,
    /// Padded row-major storage, `header.size()` long
    pub data: Vec<f32>,
}

impl Grid {
    /// NaN-filled grid for `header`.
    pub fn new(header: GridHeader) -> Self {
        let data = vec![f32::NAN; header.size()];
        Self { header, data }
    }

    /// Visible node value.
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.header.n_rows || col >= self.header.n_columns {
            return None;
        }
        self.data.get(self.header.index(row, col)).copied()
    }

    /// Set a visible node.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        if row >= self.header.n_rows || col >= self.header.n_columns {
            return Err(Error::DimensionMismatch(format!("node ({row}, {col}) outside grid")));
        }
        let i = self.header.index(row, col);
        self.data[i] = value;
        Ok(())
    }

    /// Min/max of visible nodes ignoring NaNs.
    pub fn z_range(&self) -> Option<(f32, f32)> {
        let h = &self.header;
        (0..h.n_rows)
            .flat_map(|r| (0..h.n_columns).map(move |c| (r, c)))
            .filter_map(|(r, c)| self.value(r, c))
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Expose only `sub`; returns the header to restore later.
    pub fn narrow_view(&mut self, sub: &Region) -> Result<GridHeader> {
        let narrowed = self.header.narrowed(sub)?;
        Ok(std::mem::replace(&mut self.header, narrowed))
    }

    /// Undo [`Grid::narrow_view`].
    pub fn restore_view(&mut self, original: GridHeader) {
        self.header = original;
    }

    /// Copy of the nodes inside `sub`, padded with `pad`.
    pub fn extract(&self, sub: &Region, pad: usize) -> Result<Grid> {
        let (h, w, n) = self.header.extracted(sub, pad)?;
        let mut out = Grid::new(h);
        for row in 0..out.header.n_rows {
            for col in 0..out.header.n_columns {
                let src = self.data[self.header.index(row + n, col + w)];
                let dst = out.header.index(row, col);
                out.data[dst] = src;
            }
        }
        Ok(out)
    }
}

/// Multi-band raster of bytes (band-interleaved by pixel).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Image {
    pub header: GridHeader,
    pub n_bands: usize,
    /// Padded storage, `header.size() * n_bands` long
    pub data: Vec<u8>,
}

impl Image {
    /// Zeroed image for `header`.
    pub fn new(header: GridHeader, n_bands: usize) -> Self {
        let data = vec![0; header.size() * n_bands];
        Self { header, n_bands, data }
    }

    /// Pixel bytes at a visible node.
    pub fn pixel(&self, row: usize, col: usize) -> Option<&[u8]> {
        if row >= self.header.n_rows || col >= self.header.n_columns {
            return None;
        }
        let i = self.header.index(row, col) * self.n_bands;
        self.data.get(i..i + self.n_bands)
    }

    pub fn set_pixel(&mut self, row: usize, col: usize, bands: &[u8]) -> Result<()> {
        if row >= self.header.n_rows || col >= self.header.n_columns || bands.len() != self.n_bands {
            return Err(Error::DimensionMismatch(format!("pixel ({row}, {col}) outside image")));
        }
        let i = self.header.index(row, col) * self.n_bands;
        self.data[i..i + self.n_bands].copy_from_slice(bands);
        Ok(())
    }

    pub fn narrow_view(&mut self, sub: &Region) -> Result<GridHeader> {
        let narrowed = self.header.narrowed(sub)?;
        Ok(std::mem::replace(&mut self.header, narrowed))
    }

    pub fn restore_view(&mut self, original: GridHeader) {
        self.header = original;
    }

    pub fn extract(&self, sub: &Region, pad: usize) -> Result<Image> {
        let (h, w, n) = self.header.extracted(sub, pad)?;
        let mut out = Image::new(h, self.n_bands);
        let b = self.n_bands;
        for row in 0..out.header.n_rows {
            for col in 0..out.header.n_columns {
                let src = self.header.index(row + n, col + w) * b;
                let dst = out.header.index(row, col) * b;
                out.data[dst..dst + b].copy_from_slice(&self.data[src..src + b]);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Grid {
        let h = GridHeader::new(Region::new(0.0, 4.0, 0.0, 3.0), [1.0, 1.0], Registration::Gridline, 2)
            .unwrap();
        let mut g = Grid::new(h);
        for r in 0..g.header.n_rows {
            for c in 0..g.header.n_columns {
                g.set(r, c, (r * 10 + c) as f32).unwrap();
            }
        }
        g
    }

    #[test]
    fn test_header_counts() {
        let g = ramp();
        assert_eq!(g.header.n_columns, 5);
        assert_eq!(g.header.n_rows, 4);
        assert_eq!(g.header.mx(), 9);
        assert_eq!(g.data.len(), 9 * 8);
        assert_eq!(g.header.y(0), 3.0);
    }

    #[test]
    fn test_narrow_and_restore_view() {
        let mut g = ramp();
        let original = g.narrow_view(&Region::new(1.0, 3.0, 0.0, 2.0)).unwrap();
        assert_eq!(g.header.n_columns, 3);
        assert_eq!(g.header.n_rows, 3);
        assert_eq!(g.header.mx(), 9);
        // Row 0 of the view is y = 2, i.e. original row 1; col 0 is original col 1.
        assert_eq!(g.value(0, 0), Some(11.0));
        g.restore_view(original);
        assert_eq!(g.value(0, 0), Some(0.0));
        assert_eq!(g.header.n_columns, 5);
    }

    #[test]
    fn test_extract_copies_subset() {
        let g = ramp();
        let sub = g.extract(&Region::new(2.0, 4.0, 1.0, 3.0), 0).unwrap();
        assert_eq!(sub.header.n_columns, 3);
        assert_eq!(sub.header.n_rows, 3);
        assert_eq!(sub.value(0, 0), Some(2.0));
        assert_eq!(sub.value(2, 2), Some(24.0));
        assert_eq!(sub.data.len(), 9);
    }

    #[test]
    fn test_outside_region_rejected() {
        let mut g = ramp();
        assert!(g.narrow_view(&Region::new(-5.0, 3.0, 0.0, 2.0)).is_err());
    }

    #[test]
    fn test_image_pixels() {
        let h = GridHeader::new(Region::new(0.0, 2.0, 0.0, 2.0), [1.0, 1.0], Registration::Pixel, 0)
            .unwrap();
        let mut img = Image::new(h, 3);
        img.set_pixel(1, 1, &[1, 2, 3]).unwrap();
        assert_eq!(img.pixel(1, 1), Some(&[1u8, 2, 3][..]));
        let sub = img.extract(&Region::new(1.0, 2.0, 0.0, 1.0), 0).unwrap();
        assert_eq!(sub.pixel(0, 0), Some(&[1u8, 2, 3][..]));
    }
}
