//! Tiny 3x5 bitmap font for overlay captions.
//!
//! Text is drawn upper-case; characters without a glyph render as a solid block.

use image::{Rgba, RgbaImage};

pub const GLYPH_WIDTH: u32 = 3;
pub const GLYPH_HEIGHT: u32 = 5;

/// Rows top to bottom, bit 2 is the left column.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        'A' => [0x2, 0x5, 0x7, 0x5, 0x5],
        'B' => [0x6, 0x5, 0x6, 0x5, 0x6],
        'C' => [0x7, 0x4, 0x4, 0x4, 0x7],
        'D' => [0x6, 0x5, 0x5, 0x5, 0x6],
        'E' => [0x7, 0x4, 0x6, 0x4, 0x7],
        'F' => [0x7, 0x4, 0x6, 0x4, 0x4],
        'G' => [0x3, 0x4, 0x5, 0x5, 0x3],
        'H' => [0x5, 0x5, 0x7, 0x5, 0x5],
        'I' => [0x7, 0x2, 0x2, 0x2, 0x7],
        'J' => [0x1, 0x1, 0x1, 0x5, 0x2],
        'K' => [0x5, 0x5, 0x6, 0x5, 0x5],
        'L' => [0x4, 0x4, 0x4, 0x4, 0x7],
        'M' => [0x5, 0x7, 0x7, 0x5, 0x5],
        'N' => [0x6, 0x5, 0x5, 0x5, 0x5],
        'O' => [0x7, 0x5, 0x5, 0x5, 0x7],
        'P' => [0x6, 0x5, 0x6, 0x4, 0x4],
        'Q' => [0x2, 0x5, 0x5, 0x6, 0x3],
        'R' => [0x6, 0x5, 0x6, 0x5, 0x5],
        'S' => [0x3, 0x4, 0x2, 0x1, 0x6],
        'T' => [0x7, 0x2, 0x2, 0x2, 0x2],
        'U' => [0x5, 0x5, 0x5, 0x5, 0x7],
        'V' => [0x5, 0x5, 0x5, 0x5, 0x2],
        'W' => [0x5, 0x5, 0x7, 0x7, 0x5],
        'X' => [0x5, 0x5, 0x2, 0x5, 0x5],
        'Y' => [0x5, 0x5, 0x2, 0x2, 0x2],
        'Z' => [0x7, 0x1, 0x2, 0x4, 0x7],
        '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
        '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
        '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
        '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
        '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
        '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
        '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
        '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
        '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
        '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
        ' ' => [0x0, 0x0, 0x0, 0x0, 0x0],
        ':' => [0x0, 0x2, 0x0, 0x2, 0x0],
        ',' => [0x0, 0x0, 0x0, 0x2, 0x4],
        '.' => [0x0, 0x0, 0x0, 0x0, 0x2],
        '-' => [0x0, 0x0, 0x7, 0x0, 0x0],
        '_' => [0x0, 0x0, 0x0, 0x0, 0x7],
        '(' => [0x2, 0x4, 0x4, 0x4, 0x2],
        ')' => [0x2, 0x1, 0x1, 0x1, 0x2],
        _ => [0x7, 0x7, 0x7, 0x7, 0x7],
    }
}

/// Width in pixels of `text` at `scale`, including the trailing gap.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * (GLYPH_WIDTH + 1) * scale
}

/// Draws `text` with its top-left corner at `(x, y)`; pixels off the canvas are dropped.
pub fn draw_text(
    canvas: &mut RgbaImage,
    x: i64,
    y: i64,
    text: &str,
    color: Rgba<u8>,
    scale: u32,
) {
    let scale = scale.max(1);
    let advance = i64::from((GLYPH_WIDTH + 1) * scale);
    let mut cx = x;
    for c in text.chars() {
        draw_glyph(canvas, cx, y, glyph(c), color, scale);
        cx += advance;
    }
}

fn draw_glyph(
    canvas: &mut RgbaImage,
    x: i64,
    y: i64,
    rows: [u8; 5],
    color: Rgba<u8>,
    scale: u32,
) {
    let (width, height) = (i64::from(canvas.width()), i64::from(canvas.height()));
    let scale = i64::from(scale);
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + i64::from(col) * scale + dx;
                    let py = y + row as i64 * scale + dy;
                    if (0..width).contains(&px) && (0..height).contains(&py) {
                        canvas.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgba<u8> = Rgba([128, 128, 128, 255]);
    const INK: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn draws_glyph_bits() {
        let mut canvas = RgbaImage::from_pixel(8, 8, BACKGROUND);
        draw_text(&mut canvas, 0, 0, "a", INK, 1);

        // A: .#. / #.# / ### / #.# / #.#
        assert_eq!(canvas.get_pixel(1, 0), &INK);
        assert_eq!(canvas.get_pixel(0, 0), &BACKGROUND);
        assert_eq!(canvas.get_pixel(1, 1), &BACKGROUND);
        assert_eq!(canvas.get_pixel(2, 2), &INK);
        assert_eq!(canvas.get_pixel(3, 0), &BACKGROUND);
    }

    #[test]
    fn scales_and_advances() {
        let mut canvas = RgbaImage::from_pixel(20, 12, BACKGROUND);
        draw_text(&mut canvas, 0, 0, "-1", INK, 2);

        // '-' lights row 2, which covers y 4..6 at scale 2.
        assert_eq!(canvas.get_pixel(0, 4), &INK);
        assert_eq!(canvas.get_pixel(5, 5), &INK);
        assert_eq!(canvas.get_pixel(0, 3), &BACKGROUND);
        // '1' starts one advance (8 px) to the right; its top row is .#.
        assert_eq!(canvas.get_pixel(10, 0), &INK);
        assert_eq!(canvas.get_pixel(8, 0), &BACKGROUND);
        assert_eq!(text_width("-1", 2), 16);
    }

    #[test]
    fn clips_at_canvas_edges() {
        let mut canvas = RgbaImage::from_pixel(4, 4, BACKGROUND);
        draw_text(&mut canvas, -2, -2, "AB", INK, 1);
        draw_text(&mut canvas, 100, 100, "far away", INK, 3);

        // Row 2 of 'A' (###) lands on y 0; only its right column is on the canvas.
        assert_eq!(canvas.get_pixel(0, 0), &INK);
        assert_eq!(canvas.get_pixel(3, 3), &BACKGROUND);
    }
}
