//! Screen introspection helpers: a coarse 40x24 luminance rendering and the
//! base64 raw buffer export.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub const ASCII_COLUMNS: usize = 40;
pub const ASCII_ROWS: usize = 24;

/// Ten-step luminance ramp, darkest first.
const RAMP: &[u8] = b" .:-=+*#%@";

// Visible playfield inside the full raster: 336x192 starting at (24, 24).
const VISIBLE_WIDTH: usize = 336;
const VISIBLE_HEIGHT: usize = 192;
const LEFT_MARGIN: usize = 24;
const TOP_MARGIN: usize = 24;

/// Sample the visible playfield onto a 40x24 grid, one glyph per cell.
///
/// Each cell takes the pixel at its top-left corner; the low nibble of the
/// palette index is luminance (0-15), mapped onto the ramp.
pub fn ascii_rows(screen: &[u8], width: usize, height: usize) -> Vec<String> {
    (0..ASCII_ROWS)
        .map(|row| {
            (0..ASCII_COLUMNS)
                .map(|col| {
                    if width == 0 || height == 0 {
                        return RAMP[0] as char;
                    }
                    let x = (col * VISIBLE_WIDTH / ASCII_COLUMNS + LEFT_MARGIN).min(width - 1);
                    let y = (row * VISIBLE_HEIGHT / ASCII_ROWS + TOP_MARGIN).min(height - 1);
                    let pixel = screen.get(y * width + x).copied().unwrap_or(0);
                    let luminance = (pixel & 0x0F) as usize;
                    RAMP[luminance * (RAMP.len() - 1) / 15] as char
                })
                .collect()
        })
        .collect()
}

/// Standard padded base64 of the raw palette-index buffer.
pub fn encode_raw(screen: &[u8]) -> String {
    STANDARD.encode(screen)
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 384;
    const H: usize = 240;

    #[test]
    fn blank_screen_renders_spaces() {
        let screen = vec![0u8; W * H];
        let rows = ascii_rows(&screen, W, H);
        assert_eq!(rows.len(), ASCII_ROWS);
        assert!(rows.iter().all(|r| r.len() == ASCII_COLUMNS));
        assert!(rows.iter().all(|r| r.chars().all(|c| c == ' ')));
    }

    #[test]
    fn luminance_maps_onto_ramp_ends() {
        // Hue bits are ignored; 0x9F is full luminance.
        let screen = vec![0x9Fu8; W * H];
        let rows = ascii_rows(&screen, W, H);
        assert!(rows.iter().all(|r| r.chars().all(|c| c == '@')));
    }

    #[test]
    fn samples_cell_origin() {
        let mut screen = vec![0u8; W * H];
        // Cell (row 1, col 2) samples x = 2*336/40+24 = 40, y = 1*192/24+24 = 32.
        screen[32 * W + 40] = 0x08;
        let rows = ascii_rows(&screen, W, H);
        assert_eq!(rows[1].as_bytes()[2], b'=');
        assert_eq!(rows[1].as_bytes()[1], b' ');
    }

    #[test]
    fn empty_screen_does_not_panic() {
        let rows = ascii_rows(&[], 0, 0);
        assert_eq!(rows.len(), ASCII_ROWS);
    }

    #[test]
    fn raw_export_is_padded_base64() {
        assert_eq!(encode_raw(&[0x00, 0x01]), "AAE=");
        assert_eq!(encode_raw(&[]), "");
    }
}
