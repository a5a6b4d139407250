use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, ImageReader, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::centroid::CentroidTable;
use crate::grid::{Color, PixelGrid};

pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// Widens any decoded image to 16-bit RGB samples.
pub fn grid_from_image(img: &DynamicImage) -> PixelGrid {
    let rgb = img.to_rgb16();
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    PixelGrid::from_fn(w, h, |x, y| {
        let p = rgb.get_pixel(x as u32, y as u32);
        Color::new(p[0], p[1], p[2])
    })
}

pub fn load_grid(path: impl AsRef<Path>) -> Result<PixelGrid> {
    let path = path.as_ref();
    let img = ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("reading {}", path.display()))?
        .decode()
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(grid_from_image(&img))
}

#[inline]
fn to_8bit(v: u16) -> u8 {
    (v >> 8) as u8
}

/// Paints every pixel with its cluster's centroid, scaled down to 8 bits per
/// channel and fully opaque. Unassigned samples keep their own color.
pub fn render(grid: &PixelGrid, table: &CentroidTable) -> RgbaImage {
    let centroids = table.centroids();
    let mut img: RgbaImage = ImageBuffer::new(grid.width() as u32, grid.height() as u32);
    for (px, sample) in img.pixels_mut().zip(grid.samples()) {
        let c = sample.cluster.and_then(|i| centroids.get(i).copied()).unwrap_or(sample.color);
        *px = Rgba([to_8bit(c.red), to_8bit(c.green), to_8bit(c.blue), 255]);
    }
    img
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Writes `img` in the format implied by the extension. JPEG drops the alpha
/// channel and uses `jpeg_quality`.
pub fn save_image(img: &RgbaImage, path: impl AsRef<Path>, jpeg_quality: u8) -> Result<()> {
    let path = path.as_ref();
    if is_jpeg(path) {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
        JpegEncoder::new_with_quality(BufWriter::new(file), jpeg_quality.clamp(1, 100))
            .encode_image(&rgb)
            .with_context(|| format!("encoding {}", path.display()))?;
    } else {
        img.save(path).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
