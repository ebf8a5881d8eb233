//! Image encoding for the vision recognizer: `DynamicImage` → base64 PNG.
//!
//! PNG keeps glyph edges intact; JPEG artefacts around small text cost
//! more recognition accuracy than they save in request size.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG attachment.
///
/// `detail: "high"` asks tiling models to read the page at full resolution;
/// listing pages are dense with short lines of small type.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} page → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
