//! Palette conversion and PNG screenshots.

use std::f32::consts::TAU;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use a8remote_core::error::MachineError;

/// RGB for a GTIA color byte: hue in the high nibble, luminance in the low.
///
/// Hue 0 is grey; hues 1-15 are spread evenly around the color wheel and
/// mixed with the luminance through YIQ.
pub fn rgb(color: u8) -> [u8; 3] {
    let hue = color >> 4;
    let y = f32::from(color & 0x0F) / 15.0;
    if hue == 0 {
        let v = (y * 255.0).round() as u8;
        return [v; 3];
    }
    let angle = f32::from(hue - 1) * TAU / 15.0 + 0.5;
    let saturation = 0.25;
    let i = saturation * angle.cos();
    let q = saturation * angle.sin();
    let r = y + 0.956 * i + 0.621 * q;
    let g = y - 0.272 * i - 0.647 * q;
    let b = y - 1.106 * i + 1.703 * q;
    [to_byte(r), to_byte(g), to_byte(b)]
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Expand a palette-index buffer into RGB24.
pub fn to_rgb(screen: &[u8]) -> Vec<u8> {
    screen.iter().flat_map(|&c| rgb(c)).collect()
}

/// Write a palette-index buffer as an 8-bit RGB PNG.
pub fn save_png(path: &Path, screen: &[u8], width: u32, height: u32) -> Result<(), MachineError> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| MachineError::Encoding(e.to_string()))?;
    writer
        .write_image_data(&to_rgb(screen))
        .map_err(|e| MachineError::Encoding(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_ramp_ends() {
        assert_eq!(rgb(0x00), [0, 0, 0]);
        assert_eq!(rgb(0x0F), [255, 255, 255]);
    }

    #[test]
    fn hued_colors_are_not_grey() {
        let [r, g, b] = rgb(0x46);
        assert!(r != g || g != b);
    }
}
