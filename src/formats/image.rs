//! Raster images: decoded to RGB, placed on a single page

use crate::document::{DocumentError, DocumentResult, Picture, Rendition};

/// Decode any format the `image` crate recognises; alpha is dropped
pub fn extract(data: &[u8]) -> DocumentResult<Rendition> {
    let decoded = image::load_from_memory(data)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(DocumentError::ImageError("image has no pixels".to_string()));
    }

    Ok(Rendition::Picture(Picture {
        width,
        height,
        rgb: rgb.into_raw(),
    }))
}
