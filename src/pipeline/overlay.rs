//! Software drawing on RGB frames: lines, boxes, dots, the hand skeleton and a
//! small 5x7 bitmap font for on-frame labels.

use crate::types::{Frame, hand};

pub type Color = [u8; 3];

pub const GOLD: Color = [255, 215, 0];
pub const SKY: Color = [56, 189, 248];
pub const AMBER: Color = [248, 189, 56];
pub const WARNING: Color = [255, 40, 40];
pub const WHITE: Color = [255, 255, 255];
pub const BLACK: Color = [0, 0, 0];

const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;

pub fn draw_skeleton(frame: &mut Frame, points: &[(f32, f32)], line: Color, joint: Color) {
    if points.len() < 2 {
        return;
    }

    for &(a, b) in hand::CONNECTIONS {
        if let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) {
            draw_line(frame, *pa, *pb, line, 2);
        }
    }
    for &(x, y) in points {
        draw_circle(frame, (x as i32, y as i32), 3, joint);
    }
}

pub fn draw_polyline(frame: &mut Frame, points: &[(f32, f32)], color: Color, thickness: i32) {
    for pair in points.windows(2) {
        draw_line(frame, pair[0], pair[1], color, thickness);
    }
}

pub fn draw_rect(
    frame: &mut Frame,
    (x1, y1): (i32, i32),
    (x2, y2): (i32, i32),
    color: Color,
    thickness: i32,
) {
    let corners = [
        (x1 as f32, y1 as f32),
        (x2 as f32, y1 as f32),
        (x2 as f32, y2 as f32),
        (x1 as f32, y2 as f32),
    ];
    for i in 0..4 {
        draw_line(frame, corners[i], corners[(i + 1) % 4], color, thickness);
    }
}

pub fn fill_rect(frame: &mut Frame, (x1, y1): (i32, i32), (x2, y2): (i32, i32), color: Color) {
    for y in y1.min(y2)..y1.max(y2) {
        for x in x1.min(x2)..x1.max(x2) {
            put_pixel_safe(frame, x, y, color);
        }
    }
}

pub fn draw_line(frame: &mut Frame, p0: (f32, f32), p1: (f32, f32), color: Color, thickness: i32) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(frame, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(frame, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn draw_circle(frame: &mut Frame, center: (i32, i32), radius: i32, color: Color) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Width in pixels of `text` rendered at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    let chars = text.chars().count() as i32;
    if chars == 0 {
        0
    } else {
        (chars * (GLYPH_W + 1) - 1) * scale
    }
}

pub fn text_height(scale: i32) -> i32 {
    GLYPH_H * scale
}

/// Draw `text` with its top-left corner at `origin`.
pub fn draw_text(frame: &mut Frame, text: &str, origin: (i32, i32), scale: i32, color: Color) {
    let scale = scale.max(1);
    let mut pen_x = origin.0;
    for ch in text.chars() {
        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                let x = pen_x + col * scale;
                let y = origin.1 + row as i32 * scale;
                fill_rect(frame, (x, y), (x + scale, y + scale), color);
            }
        }
        pen_x += (GLYPH_W + 1) * scale;
    }
}

/// Text on a filled backdrop, the way status banners are shown on the stream.
pub fn draw_banner(frame: &mut Frame, text: &str, origin: (i32, i32), scale: i32, fg: Color, bg: Color) {
    let pad = 2 * scale;
    fill_rect(
        frame,
        (origin.0 - pad, origin.1 - pad),
        (
            origin.0 + text_width(text, scale) + pad,
            origin.1 + text_height(scale) + pad,
        ),
        bg,
    );
    draw_text(frame, text, origin, scale, fg);
}

fn put_pixel_safe(frame: &mut Frame, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= frame.width || uy >= frame.height {
        return;
    }
    let idx = ((uy * frame.width + ux) as usize) * 3;
    if idx + 2 < frame.rgb.len() {
        frame.rgb[idx..idx + 3].copy_from_slice(&color);
    }
}

fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '%' => [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        ' ' => [0x00; 7],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * frame.width + x) * 3) as usize;
        [frame.rgb[idx], frame.rgb[idx + 1], frame.rgb[idx + 2]]
    }

    #[test]
    fn drawing_outside_the_frame_is_clipped() {
        let mut frame = Frame::blank(8, 8);
        draw_line(&mut frame, (-20.0, -20.0), (40.0, 40.0), WHITE, 3);
        draw_circle(&mut frame, (100, 100), 5, WHITE);
        assert_eq!(frame.rgb.len(), 8 * 8 * 3);
        assert_eq!(pixel(&frame, 4, 4), WHITE);
    }

    #[test]
    fn text_marks_pixels_inside_its_box_only() {
        let mut frame = Frame::blank(64, 16);
        draw_text(&mut frame, "1", (2, 2), 1, GOLD);
        // Top of the "1" stem.
        assert_eq!(pixel(&frame, 4, 2), GOLD);
        let lit = frame.rgb.chunks(3).filter(|px| *px == GOLD).count();
        assert!(lit > 0);
        assert_eq!(text_width("1", 1), 5);
        assert_eq!(text_width("12", 2), 22);
    }
}
