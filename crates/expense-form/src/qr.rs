use crate::types::*;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use qrcode::QrCode;

/// Render `payload` as a QR code without a quiet zone
pub fn qr_image(payload: &str, module_px: u32) -> Result<GrayImage> {
    let code = QrCode::new(payload.as_bytes())?;
    let module_px = module_px.max(1);
    Ok(code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(module_px, module_px)
        .build())
}

/// QR code as an RGB bitmap, the form the canvases draw
pub fn qr_rgb(payload: &str, module_px: u32) -> Result<RgbImage> {
    Ok(DynamicImage::ImageLuma8(qr_image(payload, module_px)?).to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_has_no_quiet_zone() {
        let image = qr_image("CLBX202507280001", 4).unwrap();
        assert_eq!(image.width(), image.height());
        assert_eq!(image.width() % 4, 0);
        // Finder pattern starts at the very corner
        assert_eq!(image.get_pixel(0, 0), &Luma([0u8]));
    }
}
