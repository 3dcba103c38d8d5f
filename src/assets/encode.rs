use std::{io::Cursor, path::Path};

use crate::{
    foundation::error::{AffirmError, AffirmResult},
    render::canvas::Canvas,
};

/// JPEG quality used for every `.jpg`/`.jpeg` output.
pub const JPEG_QUALITY: u8 = 90;

/// Output codec, chosen solely by the destination extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    /// Map a destination path onto a codec. Extension matching is case-insensitive and
    /// only `png`, `jpg` and `jpeg` are recognized.
    pub fn from_path(path: &Path) -> AffirmResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg {
                quality: JPEG_QUALITY,
            }),
            "" => Err(AffirmError::unsupported_output_format(format!(
                "{} (no extension)",
                path.display()
            ))),
            _ => Err(AffirmError::unsupported_output_format(format!(".{ext}"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// Encode the canvas into an in-memory file of the given format.
pub fn encode_canvas(canvas: &Canvas, format: OutputFormat) -> AffirmResult<Vec<u8>> {
    let rgba = canvas.to_rgba_image()?;
    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => {
            rgba.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| AffirmError::encode(format!("encode png: {e}")))?;
        }
        OutputFormat::Jpeg { quality } => {
            // JPEG carries no alpha channel.
            let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| AffirmError::encode(format!("encode jpeg: {e}")))?;
        }
    }
    Ok(buf)
}

/// Encode the canvas using the format implied by `path` and write it there.
pub fn save_canvas(canvas: &Canvas, path: &Path) -> AffirmResult<()> {
    let format = OutputFormat::from_path(path)?;
    let bytes = encode_canvas(canvas, format)?;
    std::fs::write(path, bytes)
        .map_err(|e| AffirmError::encode(format!("write '{}': {e}", path.display())))
}
