//! The stack view.
//!
//! Renders the data stack bottom of screen upward between the header
//! and the menu, text or graphic per settings, caching the last
//! rendered form per level. A cache entry is valid only while the
//! object pointer and the settings hash both match; the collector can
//! move objects, so cached pointers are pinned down by re-render
//! instead of chased.

use hashbrown::HashMap;
use rpl_core::render::{render, render_expression, RenderMode};
use rpl_core::object::{ObjPtr, Value};
use rpl_core::runtime::Runtime;

/// A cached rendering for one stack level.
#[derive(Debug, Clone, PartialEq)]
struct CacheSlot {
    ptr: ObjPtr,
    settings_hash: u64,
    text: String,
}

/// One display row produced by layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StackRow {
    /// Stack level this row belongs to (1 = top).
    pub level: usize,
    /// Rendered text, elided if necessary.
    pub text: String,
    /// True when this row shows an error overlay instead of a value.
    pub error: bool,
}

/// Interactive-stack command chosen from its soft menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveOp {
    /// Copy the highlighted level to level 1.
    Pick,
    /// Insert the highlighted object's text into the editor.
    Echo,
    /// Duplicate the top n levels.
    DupN,
    /// Drop the top n levels.
    DropN,
    /// Roll the highlighted level to the top.
    Roll,
    /// Sort levels 1..=highlight.
    Sort,
    /// Edit the highlighted object.
    Edit,
    /// Show object info (type and size).
    Info,
}

/// Stack view state: render cache and interactive cursor.
#[derive(Debug, Default)]
pub struct StackView {
    cache: HashMap<usize, CacheSlot>,
    /// Highlighted level in interactive mode, `None` otherwise.
    pub interactive: Option<usize>,
}

impl StackView {
    /// New, empty view.
    pub fn new() -> StackView {
        StackView::default()
    }

    /// Drop every cached rendering, e.g. after a settings change.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Rendered text for a level, through the cache.
    pub fn level_text(&mut self, rt: &Runtime, level: usize) -> Option<String> {
        let ptr = rt.level(level).ok()?;
        let hash = rt.settings.render_hash();
        if let Some(slot) = self.cache.get(&level) {
            if slot.ptr == ptr && slot.settings_hash == hash {
                return Some(slot.text.clone());
            }
        }
        let value = rt.decode(ptr).ok()?;
        let text = match &value {
            // Level text never carries the quotes; the level number
            // column already disambiguates.
            Value::Expr(tokens) => render_expression(tokens, &rt.settings),
            other => render(other, &rt.settings, RenderMode::Single),
        };
        self.cache.insert(
            level,
            CacheSlot {
                ptr,
                settings_hash: hash,
                text: text.clone(),
            },
        );
        Some(text)
    }

    /// Lay the stack out into display rows, bottom-up, within
    /// `width` columns and `height_rows` rows. Multi-line splitting
    /// and head…tail elision follow the overflow policy.
    pub fn layout(&mut self, rt: &Runtime, width: usize, height_rows: usize) -> Vec<StackRow> {
        let mut rows: Vec<StackRow> = Vec::new();
        let mut budget = height_rows;
        let mut level = 1;
        while budget > 0 && level <= rt.depth() {
            let text = match self.level_text(rt, level) {
                Some(text) => text,
                None => {
                    // A rendering failure overlays the slot and clears
                    // for the rest.
                    rows.push(StackRow {
                        level,
                        text: "Invalid object".to_owned(),
                        error: true,
                    });
                    budget -= 1;
                    level += 1;
                    continue;
                }
            };
            let label = format!("{level}: ");
            let avail = width.saturating_sub(label.len()).max(8);
            let mut lines = split_lines(&text, avail, rt.settings.multi_line_stack);
            if lines.len() > budget {
                // Too tall even split: fall back to one elided row.
                lines = vec![elide(&text, avail)];
            }
            for (i, line) in lines.iter().enumerate().rev() {
                // The level label goes on the first line only.
                let text = if i == 0 {
                    format!("{label}{line}")
                } else {
                    format!("{:width$}{line}", "", width = label.len())
                };
                rows.push(StackRow {
                    level,
                    text,
                    error: false,
                });
            }
            budget = budget.saturating_sub(lines.len());
            level += 1;
        }
        rows
    }

    /// Enter interactive mode with level 1 highlighted.
    pub fn enter_interactive(&mut self) {
        self.interactive = Some(1);
    }

    /// Leave interactive mode.
    pub fn leave_interactive(&mut self) {
        self.interactive = None;
    }

    /// Move the highlight up (to deeper levels).
    pub fn up(&mut self, rt: &Runtime) {
        if let Some(level) = self.interactive {
            if level < rt.depth() {
                self.interactive = Some(level + 1);
            }
        }
    }

    /// Move the highlight down.
    pub fn down(&mut self) {
        if let Some(level) = self.interactive {
            if level > 1 {
                self.interactive = Some(level - 1);
            }
        }
    }

    /// Apply an interactive-stack operation at the highlight.
    pub fn apply(&mut self, rt: &mut Runtime, op: InteractiveOp) -> Option<String> {
        let level = self.interactive?;
        self.invalidate();
        match op {
            InteractiveOp::Pick => {
                let ptr = rt.level(level).ok()?;
                rt.push(ptr).ok()?;
                None
            }
            InteractiveOp::Echo => {
                let text = self.level_text(rt, level);
                self.invalidate();
                text
            }
            InteractiveOp::DupN => {
                let ptrs: Vec<ObjPtr> =
                    (1..=level).rev().filter_map(|l| rt.level(l).ok()).collect();
                for ptr in ptrs {
                    rt.push(ptr).ok()?;
                }
                None
            }
            InteractiveOp::DropN => {
                for _ in 0..level {
                    let _ = rt.pop();
                }
                self.interactive = Some(1);
                None
            }
            InteractiveOp::Roll => {
                let depth = rt.depth();
                if level <= depth {
                    let at = depth - level;
                    let ptr = rt.stack()[at];
                    let mut rebuilt: Vec<ObjPtr> = rt.stack().to_vec();
                    rebuilt.remove(at);
                    rebuilt.push(ptr);
                    rt.set_stack(rebuilt);
                }
                None
            }
            InteractiveOp::Sort => {
                let depth = rt.depth();
                let n = level.min(depth);
                let mut slice: Vec<ObjPtr> = rt.stack()[depth - n..].to_vec();
                slice.sort_by(|a, b| {
                    let va = rt.decode(*a).ok();
                    let vb = rt.decode(*b).ok();
                    match (va, vb) {
                        (Some(va), Some(vb)) => va
                            .cmp_real(&vb)
                            .unwrap_or(std::cmp::Ordering::Equal),
                        _ => std::cmp::Ordering::Equal,
                    }
                });
                let mut rebuilt: Vec<ObjPtr> = rt.stack()[..depth - n].to_vec();
                rebuilt.extend(slice);
                rt.set_stack(rebuilt);
                None
            }
            InteractiveOp::Edit => {
                let text = self.level_text(rt, level);
                self.invalidate();
                text
            }
            InteractiveOp::Info => {
                let ptr = rt.level(level).ok()?;
                let id = rt.tag(ptr).ok()?;
                let size = rt.size(ptr).ok()?;
                Some(format!("{id:?}, {size} bytes"))
            }
        }
    }
}

/// Split at natural breaks (spaces) within a width.
fn split_lines(text: &str, width: usize, multi_line: bool) -> Vec<String> {
    if text.chars().count() <= width {
        return vec![text.to_owned()];
    }
    if !multi_line {
        return vec![elide(text, width)];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let candidate_len = current.chars().count() + 1 + word.chars().count();
        if !current.is_empty() && candidate_len > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        // A single oversized word is hard-wrapped.
        if word.chars().count() > width {
            let mut rest: String = word.to_owned();
            while rest.chars().count() > width {
                let head: String = rest.chars().take(width).collect();
                let tail: String = rest.chars().skip(width).collect();
                lines.push(head);
                rest = tail;
            }
            current.push_str(&rest);
        } else {
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Head … tail elision marked with an ellipsis.
fn elide(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return text.to_owned();
    }
    let keep = width.saturating_sub(1);
    let head = keep / 2 + keep % 2;
    let tail = keep / 2;
    let mut out: String = chars[..head].iter().collect();
    out.push('…');
    out.extend(chars[chars.len() - tail..].iter());
    out
}
