//! Palette - piecewise-linear color lookup table.

/// RGB triplet, components in 0..=255.
pub type Rgb = [f64; 3];

/// One z-slice of the palette.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorSlice {
    pub z_low: f64,
    pub z_high: f64,
    pub rgb_low: Rgb,
    pub rgb_high: Rgb,
    pub label: Option<String>,
}

/// Color palette.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    pub slices: Vec<ColorSlice>,
    /// Color for z below the first slice
    pub background: Rgb,
    /// Color for z above the last slice
    pub foreground: Rgb,
    pub nan_color: Rgb,
    /// Interpolate within slices (otherwise each slice is flat)
    pub continuous: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            slices: Vec::new(),
            background: [0.0; 3],
            foreground: [255.0; 3],
            nan_color: [127.5; 3],
            continuous: true,
        }
    }
}

impl Palette {
    /// Two-color linear ramp over `[z_min, z_max]`.
    pub fn ramp(z_min: f64, z_max: f64, low: Rgb, high: Rgb) -> Self {
        Self {
            slices: vec![ColorSlice {
                z_low: z_min,
                z_high: z_max,
                rgb_low: low,
                rgb_high: high,
                label: None,
            }],
            ..Self::default()
        }
    }

    #[inline]
    pub fn n_colors(&self) -> usize {
        self.slices.len()
    }

    /// Overall z-range covered by the slices.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        Some((self.slices.first()?.z_low, self.slices.last()?.z_high))
    }

    /// Color for `z`.
    pub fn color_at(&self, z: f64) -> Rgb {
        if z.is_nan() {
            return self.nan_color;
        }
        let Some((lo, hi)) = self.z_range() else {
            return self.nan_color;
        };
        if z < lo {
            return self.background;
        }
        if z > hi {
            return self.foreground;
        }
        let slice = self
            .slices
            .iter()
            .find(|s| z >= s.z_low && z <= s.z_high)
            .or_else(|| self.slices.last());
        let Some(s) = slice else {
            return self.nan_color;
        };
        if !self.continuous || s.z_high <= s.z_low {
            return s.rgb_low;
        }
        let t = (z - s.z_low) / (s.z_high - s.z_low);
        [0, 1, 2].map(|i| s.rgb_low[i] + t * (s.rgb_high[i] - s.rgb_low[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_lookup() {
        let p = Palette::ramp(0.0, 10.0, [0.0, 0.0, 0.0], [200.0, 100.0, 50.0]);
        assert_eq!(p.color_at(5.0), [100.0, 50.0, 25.0]);
        assert_eq!(p.color_at(-1.0), p.background);
        assert_eq!(p.color_at(11.0), p.foreground);
        assert_eq!(p.color_at(f64::NAN), p.nan_color);
    }
}
