use std::{path::Path, sync::Arc};

use crate::foundation::{
    error::{AffirmError, AffirmResult},
    math::mul_div255,
};

/// Decoded base image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode PNG or JPEG bytes. The codec is sniffed from the content; any other format fails.
pub fn decode_image(bytes: &[u8]) -> AffirmResult<DecodedImage> {
    let format = image::guess_format(bytes)
        .map_err(|e| AffirmError::decode(format!("unrecognized image data: {e}")))?;
    if !matches!(format, image::ImageFormat::Png | image::ImageFormat::Jpeg) {
        return Err(AffirmError::decode(format!(
            "unsupported image format {format:?} (expected png or jpeg)"
        )));
    }

    let dyn_img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| AffirmError::decode(format!("decode {format:?} image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Read and decode the image at `path`.
pub fn load_image(path: &Path) -> AffirmResult<DecodedImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| AffirmError::decode(format!("read image '{}': {e}", path.display())))?;
    decode_image(&bytes).map_err(|e| match e {
        AffirmError::Decode(msg) => AffirmError::decode(format!("'{}': {msg}", path.display())),
        other => other,
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = mul_div255(u16::from(*c), a);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode_1x1(rgba: [u8; 4], format: image::ImageFormat) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
        let mut buf = Vec::new();
        let dyn_img = if format == image::ImageFormat::Jpeg {
            image::DynamicImage::ImageRgb8(image::DynamicImage::ImageRgba8(img).to_rgb8())
        } else {
            image::DynamicImage::ImageRgba8(img)
        };
        dyn_img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn decode_image_png_dimensions_and_premul() {
        let buf = encode_1x1([100, 50, 200, 128], image::ImageFormat::Png);

        let decoded = decode_image(&buf).unwrap();
        assert_eq!(decoded.width, 1);
        assert_eq!(decoded.height, 1);
        assert_eq!(
            decoded.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_image_jpeg_is_opaque() {
        let buf = encode_1x1([10, 200, 30, 255], image::ImageFormat::Jpeg);
        let decoded = decode_image(&buf).unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 1));
        assert_eq!(decoded.rgba8_premul[3], 255);
    }

    #[test]
    fn decode_rejects_bmp_and_garbage() {
        let bmp = encode_1x1([1, 2, 3, 255], image::ImageFormat::Bmp);
        let err = decode_image(&bmp).unwrap_err();
        assert!(matches!(err, AffirmError::Decode(_)));

        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AffirmError::Decode(_)));
    }

    #[test]
    fn load_image_missing_file_is_decode_error() {
        let err = load_image(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, AffirmError::Decode(_)));
        assert!(err.to_string().contains("exist.png"));
    }
}
