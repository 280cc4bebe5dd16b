use std::io::Cursor;

use super::*;

fn png(w: u32, h: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_dimensions_and_premul() {
    let decoded = decode_image(&png(1, 1, vec![100, 50, 200, 128])).unwrap();
    assert_eq!(decoded.width(), 1);
    assert_eq!(decoded.height(), 1);
    assert_eq!(
        decoded.rgba8_premul(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn fully_transparent_pixels_zero_color() {
    let decoded = decode_image(&png(1, 1, vec![9, 9, 9, 0])).unwrap();
    assert_eq!(decoded.rgba8_premul(), &[0, 0, 0, 0]);
}

#[test]
fn garbage_and_empty_input_are_errors() {
    assert!(matches!(
        decode_image(b"definitely not an image"),
        Err(VistaError::Decode(_))
    ));
    assert!(matches!(decode_image(&[]), Err(VistaError::Decode(_))));
}
