use anyhow::{anyhow, bail, Result};
use image::{imageops, RgbaImage};

const RGBA_BYTES: usize = 4;

/// Borrowed view of the first plane of an acquired RGBA frame.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    pub data: &'a [u8],
    pub pixel_stride: usize,
    pub row_stride: usize,
}

/// Bytes at the end of every row that do not belong to the image.
pub fn row_padding(pixel_stride: usize, row_stride: usize, width: u32) -> Result<usize> {
    let used = pixel_stride * width as usize;
    row_stride
        .checked_sub(used)
        .ok_or_else(|| anyhow!("row stride {row_stride} is shorter than a {width}px row"))
}

/// Turn a row-strided plane into a dense `width`×`height` image.
///
/// The plane is first copied into an image wide enough to hold the row
/// padding as extra pixels, which is then cropped back to `width` columns.
pub fn assemble_image(plane: &PlaneView<'_>, width: u32, height: u32) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        bail!("frame has empty bounds {width}x{height}");
    }
    if plane.pixel_stride != RGBA_BYTES {
        bail!("unsupported pixel stride {}", plane.pixel_stride);
    }
    let padding = row_padding(plane.pixel_stride, plane.row_stride, width)?;
    if padding % plane.pixel_stride != 0 {
        bail!(
            "row padding {padding} is not a whole number of {}-byte pixels",
            plane.pixel_stride
        );
    }

    // The final row is allowed to stop right after its last pixel.
    let minimum = (height as usize - 1) * plane.row_stride + width as usize * RGBA_BYTES;
    if plane.data.len() < minimum {
        bail!(
            "frame buffer holds {} bytes, {minimum} required",
            plane.data.len()
        );
    }

    let padded_width = width as usize + padding / plane.pixel_stride;
    let needed = padded_width * RGBA_BYTES * height as usize;
    let mut pixels = vec![0u8; needed];
    let copied = needed.min(plane.data.len());
    pixels[..copied].copy_from_slice(&plane.data[..copied]);

    let padded = RgbaImage::from_raw(padded_width as u32, height, pixels)
        .ok_or_else(|| anyhow!("padded buffer does not match {padded_width}x{height}"))?;
    if padding == 0 {
        return Ok(padded);
    }
    Ok(imageops::crop_imm(&padded, 0, 0, width, height).to_image())
}
