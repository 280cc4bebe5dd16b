use crate::{
    foundation::core::Image,
    foundation::error::{VistaError, VistaResult},
};

/// Decode encoded bytes (PNG, JPEG, ...) into a premultiplied [`Image`].
pub fn decode_image(bytes: &[u8]) -> VistaResult<Image> {
    if bytes.is_empty() {
        return Err(VistaError::decode("no image data"));
    }
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| VistaError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Image::from_rgba8_premul(width, height, rgba8_premul)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let alpha = u32::from(px[3]);
        for channel in &mut px[..3] {
            // Rounded division by 255.
            *channel = ((u32::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/decode.rs"]
mod tests;
