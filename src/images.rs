//! Reading user-selected images into self-contained payloads, and preparing
//! them for the exported document.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage, Rgba, RgbaImage};

use crate::error::Error;
use crate::model::ImagePayload;

pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Reads `path`, sniffs its format from the bytes and decodes it once.
///
/// The path is not kept; the payload carries everything needed to render it.
/// A file whose header looks right but whose body does not decode is rejected
/// here, so a broken upload never reaches the renderer.
pub fn read_image(path: &Path) -> Result<ImagePayload, Error> {
    let bytes = fs::read(path)?;
    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    tracing::debug!(
        path = %path.display(),
        ?format,
        len = bytes.len(),
        width = decoded.width(),
        height = decoded.height(),
        "image read"
    );
    Ok(ImagePayload::new(format, bytes))
}

/// Flattens onto white, caps the pixel width and encodes as JPEG.
///
/// `max_width` is in pixels; `quality` is 1..=100.
pub fn to_jpeg(payload: &ImagePayload, max_width: u32, quality: u8) -> Result<Vec<u8>, Error> {
    let decoded = image::load_from_memory_with_format(&payload.bytes, payload.format)?;
    let decoded = if max_width > 0 && decoded.width() > max_width {
        let height = (decoded.height() as u64 * max_width as u64 / decoded.width() as u64).max(1);
        decoded.resize(max_width, height as u32, FilterType::Lanczos3)
    } else {
        decoded
    };

    let flat = flatten_on_white(&decoded);
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    flat.write_with_encoder(encoder)?;
    Ok(out.into_inner())
}

fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// File extension for a payload re-encoded by [`to_jpeg`].
pub fn jpeg_extension() -> &'static str {
    ImageFormat::Jpeg.extensions_str()[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn format_is_sniffed_not_taken_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.jpg");
        fs::write(&path, png_bytes(4, 4, Rgba([255, 0, 0, 255]))).unwrap();

        let payload = read_image(&path).unwrap();
        assert_eq!(payload.format, ImageFormat::Png);
        assert_eq!(payload.mime_type(), "image/png");
    }

    #[test]
    fn non_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello there").unwrap();

        assert!(matches!(read_image(&path), Err(Error::Image(_))));
    }

    #[test]
    fn valid_header_with_broken_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(b"garbage that is not a png stream");
        fs::write(&path, &bytes).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert!(matches!(read_image(&path), Err(Error::Image(_))));
    }

    #[test]
    fn half_written_png_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        let full = png_bytes(16, 16, Rgba([0, 128, 255, 255]));
        fs::write(&path, &full[..full.len() / 2]).unwrap();

        assert!(matches!(read_image(&path), Err(Error::Image(_))));
    }

    #[test]
    fn partly_transparent_pixels_blend_towards_white() {
        let payload = ImagePayload::new(ImageFormat::Png, png_bytes(8, 8, Rgba([0, 0, 0, 128])));
        let jpeg = to_jpeg(&payload, 0, 100).unwrap();
        let px = image::load_from_memory(&jpeg).unwrap().to_rgb8().get_pixel(4, 4).0;
        assert!(px.iter().all(|c| (110..=145).contains(c)), "half alpha over white, got {px:?}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_image(&dir.path().join("gone.png")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn jpeg_output_is_downscaled_and_opaque() {
        let payload = ImagePayload::new(ImageFormat::Png, png_bytes(400, 100, Rgba([0, 0, 0, 0])));

        let jpeg = to_jpeg(&payload, 200, 98).unwrap();
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();

        assert_eq!(decoded.width(), 200);
        assert_eq!(decoded.height(), 50);
        let px = decoded.to_rgb8().get_pixel(10, 10).0;
        assert!(px.iter().all(|c| *c > 240), "transparent pixels become white, got {px:?}");
    }

    #[test]
    fn small_images_keep_their_size() {
        let payload = ImagePayload::new(ImageFormat::Png, png_bytes(30, 20, Rgba([10, 20, 30, 255])));
        let jpeg = to_jpeg(&payload, 200, 98).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 20));
    }
}
