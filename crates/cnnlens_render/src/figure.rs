//! Image grids with per-panel titles.
//!
//! Panel titles are drawn with an 8×8 bitmap font in a strip above each
//! tile. Axis captions and the legend are kept as metadata.

use std::fmt;
use std::path::Path;

use image::imageops::{self, FilterType};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use tracing::{debug, info};

use cnnlens_core::HwcImage;

use crate::error::{RenderError, Result};

/// Gap between tiles, in pixels.
pub const PADDING: u32 = 2;

/// Height of the title strip above each tile, in pixels.
pub const CAPTION_HEIGHT: u32 = GLYPH + 2;

const GLYPH: u32 = 8;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Convert an RGB image with values in [0, 1] to 8-bit. Values outside the
/// range are clipped.
pub fn hwc_to_rgb(image: &HwcImage) -> Result<RgbImage> {
    if image.channels() != 3 {
        return Err(cnnlens_core::CoreError::ChannelMismatch {
            expected: 3,
            got: image.channels(),
        }
        .into());
    }
    let bytes = image
        .as_slice()
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(image.width() as u32, image.height() as u32, bytes)
        .ok_or_else(|| RenderError::InvalidGrid("image buffer size mismatch".to_string()))
}

/// A `rows × columns` grid of tiles on a white background.
#[derive(Debug, Clone)]
pub struct Figure {
    image: RgbImage,
    rows: usize,
    columns: usize,
    cell: (u32, u32),
    padding: u32,
    caption: u32,
    titles: Vec<String>,
    xlabel: Option<String>,
    ylabel: Option<String>,
    legend: Option<String>,
}

impl Figure {
    /// Lay out `tiles` row by row, each upscaled by `tile_scale`.
    ///
    /// Cells are sized to the largest tile. `titles` must be empty or have
    /// one entry per tile; when present each cell gains a title strip of
    /// [`CAPTION_HEIGHT`] pixels, with text clipped to the cell width.
    pub fn compose(
        tiles: &[RgbImage],
        titles: Vec<String>,
        rows: usize,
        columns: usize,
        tile_scale: u32,
    ) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(RenderError::InvalidGrid(format!("{rows}x{columns} grid")));
        }
        if tiles.len() > rows * columns {
            return Err(RenderError::InvalidGrid(format!(
                "{} tiles do not fit a {rows}x{columns} grid",
                tiles.len()
            )));
        }
        if !titles.is_empty() && titles.len() != tiles.len() {
            return Err(RenderError::InvalidGrid(format!(
                "{} titles for {} tiles",
                titles.len(),
                tiles.len()
            )));
        }

        let scale = tile_scale.max(1);
        let cell_w = tiles.iter().map(RgbImage::width).max().unwrap_or(0) * scale;
        let caption = if titles.is_empty() { 0 } else { CAPTION_HEIGHT };
        let cell_h = tiles.iter().map(RgbImage::height).max().unwrap_or(0) * scale + caption;
        let width = columns as u32 * cell_w + (columns as u32 + 1) * PADDING;
        let height = rows as u32 * cell_h + (rows as u32 + 1) * PADDING;

        let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
        for (i, tile) in tiles.iter().enumerate() {
            let (x, y) = cell_origin(i, columns, (cell_w, cell_h), PADDING);
            let scaled = if scale == 1 {
                tile.clone()
            } else {
                imageops::resize(tile, tile.width() * scale, tile.height() * scale, FilterType::Nearest)
            };
            imageops::replace(&mut image, &scaled, i64::from(x), i64::from(y + caption));
            if let Some(title) = titles.get(i) {
                draw_caption(&mut image, title, x, y, cell_w);
            }
        }

        debug!(rows, columns, tiles = tiles.len(), width, height, "composed figure");
        Ok(Self {
            image,
            rows,
            columns,
            cell: (cell_w, cell_h),
            padding: PADDING,
            caption,
            titles,
            xlabel: None,
            ylabel: None,
            legend: None,
        })
    }

    /// Set the x-axis caption.
    #[must_use]
    pub fn with_xlabel(mut self, label: impl Into<String>) -> Self {
        self.xlabel = Some(label.into());
        self
    }

    /// Set the y-axis caption.
    #[must_use]
    pub fn with_ylabel(mut self, label: impl Into<String>) -> Self {
        self.ylabel = Some(label.into());
        self
    }

    /// Set the legend text.
    #[must_use]
    pub fn with_legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = Some(legend.into());
        self
    }

    /// Composed pixels.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consume the figure, returning its pixels.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Grid `(rows, columns)`.
    pub fn grid(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    /// Panel titles in row-major order.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// X-axis caption.
    pub fn xlabel(&self) -> Option<&str> {
        self.xlabel.as_deref()
    }

    /// Y-axis caption.
    pub fn ylabel(&self) -> Option<&str> {
        self.ylabel.as_deref()
    }

    /// Legend text.
    pub fn legend(&self) -> Option<&str> {
        self.legend.as_deref()
    }

    /// Top-left pixel of the tile in panel `index`.
    pub fn panel_origin(&self, index: usize) -> (u32, u32) {
        let (x, y) = cell_origin(index, self.columns, self.cell, self.padding);
        (x, y + self.caption)
    }

    /// Top-left pixel of the title strip of panel `index`, if titled.
    pub fn caption_origin(&self, index: usize) -> Option<(u32, u32)> {
        (self.caption > 0).then(|| cell_origin(index, self.columns, self.cell, self.padding))
    }

    /// Height of the title strip, zero for untitled figures.
    pub fn caption_height(&self) -> u32 {
        self.caption
    }

    /// Nearest-neighbour upscale of the whole figure.
    #[must_use]
    pub fn upscale(mut self, factor: u32) -> Self {
        if factor > 1 {
            let (w, h) = self.image.dimensions();
            self.image = imageops::resize(&self.image, w * factor, h * factor, FilterType::Nearest);
            self.cell = (self.cell.0 * factor, self.cell.1 * factor);
            self.padding *= factor;
            self.caption *= factor;
        }
        self
    }

    /// Write the figure; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.image.save(path)?;
        info!(path = %path.display(), "saved figure");
        Ok(())
    }
}

fn cell_origin(index: usize, columns: usize, cell: (u32, u32), padding: u32) -> (u32, u32) {
    let row = (index / columns) as u32;
    let col = (index % columns) as u32;
    (
        padding + col * (cell.0 + padding),
        padding + row * (cell.1 + padding),
    )
}

/// Draw `text` centred in a `width`-wide strip whose top-left is `(x, y)`.
///
/// Characters past the strip width are dropped; characters without a glyph
/// are left blank.
fn draw_caption(image: &mut RgbImage, text: &str, x: u32, y: u32, width: u32) {
    let fits = (width / GLYPH) as usize;
    let chars: Vec<char> = text.chars().take(fits).collect();
    let text_w = chars.len() as u32 * GLYPH;
    let left = x + (width - text_w) / 2;
    let top = y + (CAPTION_HEIGHT - GLYPH) / 2;

    for (i, ch) in chars.into_iter().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let gx = left + i as u32 * GLYPH;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH {
                if bits & (1 << col) != 0 {
                    image.put_pixel(gx + col, top + row as u32, INK);
                }
            }
        }
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.image.dimensions();
        writeln!(f, "Figure {}x{} ({w}x{h} px)", self.rows, self.columns)?;
        for row in self.titles.chunks(self.columns) {
            writeln!(f, "  {}", row.join(" | "))?;
        }
        if let Some(x) = &self.xlabel {
            writeln!(f, "  x: {x}")?;
        }
        if let Some(y) = &self.ylabel {
            writeln!(f, "  y: {y}")?;
        }
        if let Some(legend) = &self.legend {
            writeln!(f, "  legend: {legend}")?;
        }
        Ok(())
    }
}
