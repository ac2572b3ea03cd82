//! Graphical formula rendering into grobs.
//!
//! Rasterizes a value's text into a 1-bpp grob within a bounded
//! envelope and a soft wall-clock budget. When the layout exceeds the
//! envelope the renderer drops to the next smaller font and retries;
//! when the budget or the smallest font is exhausted it returns `None`
//! and the caller falls back to text.

use rpl_core::object::Value;
use rpl_core::render::{render, RenderMode};
use rpl_core::runtime::Runtime;

/// Size constraints and time budget for one rasterization.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    /// Maximum grob width in pixels.
    pub max_width: u32,
    /// Maximum grob height in pixels.
    pub max_height: u32,
    /// Soft wall-clock budget in milliseconds.
    pub budget_ms: u64,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope {
            max_width: 400,
            max_height: 120,
            budget_ms: 50,
        }
    }
}

/// Font ladder: glyph cell sizes tried largest first.
const SIZES: [(u32, u32); 3] = [(6, 10), (5, 8), (4, 6)];

/// Rasterize a value, or `None` when it cannot fit the envelope within
/// the budget. `now_ms` samples the wall clock.
pub fn rasterize(
    rt: &Runtime,
    value: &Value,
    envelope: Envelope,
    now_ms: &mut dyn FnMut() -> u64,
) -> Option<Value> {
    let deadline = now_ms().saturating_add(envelope.budget_ms);
    let text = render(value, &rt.settings, RenderMode::Multi);
    let lines: Vec<&str> = text.lines().collect();

    for (cell_w, cell_h) in SIZES {
        if now_ms() > deadline {
            return None;
        }
        let width = lines
            .iter()
            .map(|l| l.chars().count() as u32 * cell_w)
            .max()
            .unwrap_or(0)
            .max(1);
        let height = (lines.len() as u32 * cell_h).max(1);
        if width > envelope.max_width || height > envelope.max_height {
            continue;
        }
        return Some(draw(&lines, width, height, cell_w, cell_h));
    }
    None
}

/// Draw the text into a packed 1-bpp grob with a blocky builtin face:
/// a filled cell body per glyph, hairline gaps between cells.
fn draw(lines: &[&str], width: u32, height: u32, cell_w: u32, cell_h: u32) -> Value {
    let row_bytes = (width as usize + 7) / 8;
    let mut pixels = vec![0u8; row_bytes * height as usize];
    for (row, line) in lines.iter().enumerate() {
        for (col, c) in line.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let x0 = col as u32 * cell_w;
            let y0 = row as u32 * cell_h;
            for y in y0 + 1..(y0 + cell_h - 1).min(height) {
                for x in x0..(x0 + cell_w - 1).min(width) {
                    let at = y as usize * row_bytes + (x / 8) as usize;
                    pixels[at] |= 0x80 >> (x % 8);
                }
            }
        }
    }
    Value::Grob {
        width,
        height,
        color: false,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(mut t: u64, step: u64) -> impl FnMut() -> u64 {
        move || {
            t += step;
            t
        }
    }

    #[test]
    fn small_values_rasterize_at_the_largest_size() {
        let rt = Runtime::default();
        let mut now = clock(0, 1);
        let grob = rasterize(&rt, &Value::Int(42), Envelope::default(), &mut now).unwrap();
        let Value::Grob { width, height, .. } = grob else {
            panic!("expected grob");
        };
        assert_eq!(width, 2 * 6);
        assert_eq!(height, 10);
    }

    #[test]
    fn wide_values_shrink_to_fit() {
        let rt = Runtime::default();
        let envelope = Envelope {
            max_width: 80,
            max_height: 40,
            budget_ms: 1000,
        };
        // 16 glyphs: too wide at 6 px/cell (96), fits at 5 (80).
        let text = Value::Text("aaaaaaaaaaaaaa".into());
        let mut now = clock(0, 1);
        let grob = rasterize(&rt, &text, envelope, &mut now).unwrap();
        let Value::Grob { width, .. } = grob else {
            panic!("expected grob");
        };
        assert_eq!(width, 80);
    }

    #[test]
    fn impossible_envelopes_fall_back_to_none() {
        let rt = Runtime::default();
        let envelope = Envelope {
            max_width: 10,
            max_height: 4,
            budget_ms: 1000,
        };
        let text = Value::Text("much too wide for ten pixels".into());
        let mut now = clock(0, 1);
        assert!(rasterize(&rt, &text, envelope, &mut now).is_none());
    }

    #[test]
    fn an_exhausted_budget_aborts() {
        let rt = Runtime::default();
        let envelope = Envelope {
            budget_ms: 5,
            ..Envelope::default()
        };
        // Each clock sample advances 10 ms, blowing the budget at once.
        let mut now = clock(0, 10);
        assert!(rasterize(&rt, &Value::Int(1), envelope, &mut now).is_none());
    }

    #[test]
    fn grobs_set_pixels_for_glyph_cells() {
        let rt = Runtime::default();
        let mut now = clock(0, 1);
        let grob = rasterize(&rt, &Value::Int(8), Envelope::default(), &mut now).unwrap();
        let Value::Grob { pixels, .. } = grob else {
            panic!("expected grob");
        };
        assert!(pixels.iter().any(|b| *b != 0));
    }
}
