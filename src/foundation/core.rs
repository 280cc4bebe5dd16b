use std::sync::Arc;

use crate::foundation::error::{VistaError, VistaResult};

pub use kurbo::{Rect, Size};

/// How a view lays out its image inside its bounds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Stretch the image to fill the bounds exactly.
    #[default]
    ScaleToFill,
    /// Scale preserving aspect ratio so the whole image is visible.
    AspectFit,
    /// Scale preserving aspect ratio so the bounds are fully covered.
    AspectFill,
    /// Keep the image at its natural size, centered.
    Center,
}

struct ImageData {
    width: u32,
    height: u32,
    rgba8_premul: Vec<u8>,
}

/// Shared handle to decoded pixels in premultiplied RGBA8 form.
///
/// Cloning is cheap. Equality is handle identity: two clones of the same
/// decoded image compare equal, two separately decoded copies of the same
/// bytes do not.
#[derive(Clone)]
pub struct Image {
    data: Arc<ImageData>,
}

impl Image {
    /// Wrap row-major, tightly packed premultiplied RGBA8 pixels.
    pub fn from_rgba8_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> VistaResult<Self> {
        let expected = u64::from(width) * u64::from(height) * 4;
        if rgba8_premul.len() as u64 != expected {
            return Err(VistaError::validation(format!(
                "image buffer has {} bytes, expected {expected} for {width}x{height}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            data: Arc::new(ImageData {
                width,
                height,
                rgba8_premul,
            }),
        })
    }

    /// Build an image filled with a single premultiplied color.
    pub fn solid(width: u32, height: u32, rgba8_premul: [u8; 4]) -> Self {
        let px = width as usize * height as usize;
        let mut buf = Vec::with_capacity(px * 4);
        for _ in 0..px {
            buf.extend_from_slice(&rgba8_premul);
        }
        Self {
            data: Arc::new(ImageData {
                width,
                height,
                rgba8_premul: buf,
            }),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.data.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.data.height
    }

    /// Natural size in pixels.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.data.width), f64::from(self.data.height))
    }

    /// `true` when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.data.width == 0 || self.data.height == 0
    }

    /// Pixel bytes in row-major premultiplied RGBA8.
    pub fn rgba8_premul(&self) -> &[u8] {
        &self.data.rgba8_premul
    }

    /// `true` when both handles point at the same decoded pixels.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Image {}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("ptr", &Arc::as_ptr(&self.data))
            .field("width", &self.data.width)
            .field("height", &self.data.height)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
