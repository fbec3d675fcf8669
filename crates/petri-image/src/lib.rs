//! Rendering cell grids to RGB images.
//!
//! [`DrawParams`] picks the colors and an integer upscale factor; [`render`]
//! turns a 2D grid into an [`image::RgbImage`] where each cell is drawn as a
//! square block of uniform color.
//!
//! # Example
//!
//! ```
//! use petri_automata::Grid;
//! use petri_image::{render, DrawParams};
//!
//! let grid = Grid::from_rows(&[vec![0, 1], vec![1, 0]]).unwrap();
//! let params = DrawParams::new([0, 0, 0], [255, 255, 255], 4).unwrap();
//!
//! // Each cell becomes a 4x4 block: an 8x8 checker image.
//! let frame = render(&grid, &params).unwrap();
//! assert_eq!(frame.dimensions(), (8, 8));
//! ```

use std::path::Path;

use image::{Rgb, RgbImage};
use thiserror::Error;

use petri_automata::Grid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors raised while building draw parameters or rendering frames.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The resize factor must be at least 1.
    #[error("resize factor must be at least 1")]
    InvalidResizeFactor,

    /// A color ramp was given without any entries.
    #[error("color ramp is empty")]
    EmptyRamp,

    /// Only 2D grids can be rendered.
    #[error("cannot render a {ndim}-dimensional grid")]
    NotTwoDimensional {
        /// Dimensionality of the grid that was given.
        ndim: usize,
    },

    /// Writing an image file failed.
    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),
}

/// How cells are drawn: one color per cell value plus an upscale factor.
///
/// Immutable once constructed. Colors are 3-channel RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DrawParams {
    dead_color: [u8; 3],
    alive_color: [u8; 3],
    ramp: Option<Vec<[u8; 3]>>,
    resize_factor: u32,
}

impl DrawParams {
    /// Creates draw parameters for a binary automaton.
    ///
    /// A `resize_factor` of 1 draws each cell as a single pixel, while 4
    /// draws each cell as a 4x4 square of 16 pixels.
    pub fn new(
        dead_color: [u8; 3],
        alive_color: [u8; 3],
        resize_factor: u32,
    ) -> Result<Self, RenderError> {
        if resize_factor < 1 {
            return Err(RenderError::InvalidResizeFactor);
        }
        Ok(Self {
            dead_color,
            alive_color,
            ramp: None,
            resize_factor,
        })
    }

    /// Colors multi-state cells from a ramp indexed by cell value.
    ///
    /// Value 0 still draws with the dead color; values past the end of the
    /// ramp clamp to its last entry.
    pub fn with_ramp(mut self, ramp: Vec<[u8; 3]>) -> Result<Self, RenderError> {
        if ramp.is_empty() {
            return Err(RenderError::EmptyRamp);
        }
        self.ramp = Some(ramp);
        Ok(self)
    }

    /// The color for dead (zero) cells.
    pub fn dead_color(&self) -> [u8; 3] {
        self.dead_color
    }

    /// The color for live cells when no ramp is set.
    pub fn alive_color(&self) -> [u8; 3] {
        self.alive_color
    }

    /// The multi-state color ramp, if any.
    pub fn ramp(&self) -> Option<&[[u8; 3]]> {
        self.ramp.as_deref()
    }

    /// The integer upscale factor.
    pub fn resize_factor(&self) -> u32 {
        self.resize_factor
    }

    /// Output pixel dimensions for a grid of `width x height` cells.
    pub fn frame_size(&self, grid_width: usize, grid_height: usize) -> (u32, u32) {
        (
            grid_width as u32 * self.resize_factor,
            grid_height as u32 * self.resize_factor,
        )
    }

    fn color_of(&self, value: u8) -> [u8; 3] {
        if value == 0 {
            return self.dead_color;
        }
        match &self.ramp {
            Some(ramp) => ramp[usize::from(value).min(ramp.len() - 1)],
            None => self.alive_color,
        }
    }
}

/// Renders a 2D grid to an RGB image.
///
/// Each cell is expanded to a `resize_factor` square block of uniform color:
/// the dead color for value 0, the alive color (or the ramp entry for the
/// value) otherwise.
pub fn render(grid: &Grid, params: &DrawParams) -> Result<RgbImage, RenderError> {
    if grid.ndim() != 2 {
        return Err(RenderError::NotTwoDimensional { ndim: grid.ndim() });
    }
    let height = grid.height();
    let width = grid.width();
    let factor = params.resize_factor();

    let mut img = RgbImage::new(width as u32 * factor, height as u32 * factor);
    for y in 0..height {
        for x in 0..width {
            let color = Rgb(params.color_of(grid.get(&[y, x])));
            for py in 0..factor {
                for px in 0..factor {
                    img.put_pixel(x as u32 * factor + px, y as u32 * factor + py, color);
                }
            }
        }
    }
    Ok(img)
}

/// Writes an image to a PNG file.
pub fn export_png<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<(), RenderError> {
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_factor_validation() {
        assert!(matches!(
            DrawParams::new([0, 0, 0], [255, 255, 255], 0),
            Err(RenderError::InvalidResizeFactor)
        ));
        assert!(DrawParams::new([0, 0, 0], [255, 255, 255], 1).is_ok());
    }

    #[test]
    fn test_empty_ramp_rejected() {
        let params = DrawParams::new([0, 0, 0], [255, 255, 255], 1).unwrap();
        assert!(matches!(
            params.with_ramp(Vec::new()),
            Err(RenderError::EmptyRamp)
        ));
    }

    #[test]
    fn test_render_single_pixels() {
        let grid = Grid::from_rows(&[vec![0, 1], vec![1, 0]]).unwrap();
        let params = DrawParams::new([10, 20, 30], [200, 100, 50], 1).unwrap();
        let img = render(&grid, &params).unwrap();

        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(img.get_pixel(1, 0).0, [200, 100, 50]);
        assert_eq!(img.get_pixel(0, 1).0, [200, 100, 50]);
        assert_eq!(img.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_render_upscales_blocks() {
        let grid = Grid::from_rows(&[vec![1, 0]]).unwrap();
        let params = DrawParams::new([0, 0, 0], [255, 255, 255], 3).unwrap();
        let img = render(&grid, &params).unwrap();

        assert_eq!(img.dimensions(), (6, 3));
        // Every pixel of the first 3x3 block is the alive color.
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(img.get_pixel(x, y).0, [255, 255, 255]);
            }
        }
        assert_eq!(img.get_pixel(3, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(5, 2).0, [0, 0, 0]);
    }

    #[test]
    fn test_render_ramp_lookup() {
        let grid = Grid::from_rows(&[vec![0, 1, 2, 3]]).unwrap();
        let params = DrawParams::new([0, 0, 0], [255, 255, 255], 1)
            .unwrap()
            .with_ramp(vec![[9, 9, 9], [50, 0, 0], [100, 0, 0]])
            .unwrap();
        let img = render(&grid, &params).unwrap();

        // Value 0 keeps the dead color, not the ramp base.
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [50, 0, 0]);
        assert_eq!(img.get_pixel(2, 0).0, [100, 0, 0]);
        // Values past the ramp end clamp to the last entry.
        assert_eq!(img.get_pixel(3, 0).0, [100, 0, 0]);
    }

    #[test]
    fn test_render_rejects_non_2d() {
        let grid = Grid::new(&[2, 2, 2]).unwrap();
        let params = DrawParams::new([0, 0, 0], [255, 255, 255], 1).unwrap();
        assert!(matches!(
            render(&grid, &params),
            Err(RenderError::NotTwoDimensional { ndim: 3 })
        ));
    }

    #[test]
    fn test_frame_size() {
        let params = DrawParams::new([0, 0, 0], [255, 255, 255], 4).unwrap();
        assert_eq!(params.frame_size(64, 48), (256, 192));
    }

    #[test]
    fn test_export_png() {
        let grid = Grid::from_rows(&[vec![0, 1], vec![1, 0]]).unwrap();
        let params = DrawParams::new([0, 0, 0], [255, 255, 255], 2).unwrap();
        let img = render(&grid, &params).unwrap();

        let path = std::env::temp_dir().join("petri_image_test_export.png");
        export_png(&img, &path).unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len > 0);
        let _ = std::fs::remove_file(&path);
    }
}
