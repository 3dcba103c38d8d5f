use crate::{
    assets::decode::DecodedImage,
    foundation::error::{AffirmError, AffirmResult},
};

/// Mutable premultiplied RGBA8 pixel buffer that text is composited into.
///
/// A canvas is always a full copy of the image it was created from and keeps that image's
/// dimensions for its whole life.
pub struct Canvas {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    /// Copy `image` into a new canvas.
    pub fn from_image(image: &DecodedImage) -> AffirmResult<Self> {
        let pixmap = premul_bytes_to_pixmap(image.rgba8_premul.as_slice(), image.width, image.height)?;
        Ok(Self {
            width: pixmap.width(),
            height: pixmap.height(),
            pixmap,
        })
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Row-major premultiplied RGBA8 bytes.
    pub fn premul_bytes(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    /// Straight-alpha RGBA8 value at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let i = (y as usize * self.width() as usize + x as usize) * 4;
        let px = &self.premul_bytes()[i..i + 4];
        Some(unpremultiply([px[0], px[1], px[2], px[3]]))
    }

    /// Straight-alpha copy of the canvas for encoding.
    pub fn to_rgba_image(&self) -> AffirmResult<image::RgbaImage> {
        let mut data = self.premul_bytes().to_vec();
        for px in data.chunks_exact_mut(4) {
            let out = unpremultiply([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        }
        image::RgbaImage::from_raw(self.width(), self.height(), data)
            .ok_or_else(|| AffirmError::encode("canvas byte length does not match its dimensions"))
    }

    /// Snapshot of the current pixels as an image paint, for redrawing underneath new content.
    pub(crate) fn snapshot_paint(&self) -> AffirmResult<vello_cpu::Image> {
        let pixmap = premul_bytes_to_pixmap(self.premul_bytes(), self.width(), self.height())?;
        Ok(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        })
    }

    pub(crate) fn dims_u16(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut vello_cpu::Pixmap {
        &mut self.pixmap
    }
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> AffirmResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| AffirmError::draw("image width exceeds 65535 pixels"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| AffirmError::draw("image height exceeds 65535 pixels"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(AffirmError::draw("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = u32::from(px[3]);
    match a {
        0 => [0, 0, 0, 0],
        255 => px,
        _ => {
            let un = |c: u8| -> u8 { ((u32::from(c) * 255 + a / 2) / a).min(255) as u8 };
            [un(px[0]), un(px[1]), un(px[2]), px[3]]
        }
    }
}
