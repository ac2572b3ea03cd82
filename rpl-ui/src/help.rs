//! The help browser.
//!
//! One large markdown-like corpus plus an index of `(topic, offset)`
//! pairs. Lookup goes through the index when present and falls back to
//! a linear scan; the topic streams through a soft renderer that
//! understands a small markup subset. Links that match a command name
//! are highlighted and followable.

use rpl_core::parse::command_named;

/// A styled span of help text.
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    /// Plain body text.
    Text(String),
    /// Bold.
    Bold(String),
    /// Italic.
    Italic(String),
    /// Inline code.
    Code(String),
    /// A link; `command` is set when the target names a command.
    Link {
        /// Link label.
        label: String,
        /// Link target (topic or path).
        target: String,
        /// True when the target resolves to a known command.
        command: bool,
    },
    /// An image referenced by path.
    Image(String),
}

/// A rendered help line.
#[derive(Debug, Clone, PartialEq)]
pub enum HelpLine {
    /// Topic heading with its level.
    Heading(u8, String),
    /// A bullet item.
    Bullet(Vec<Span>),
    /// A code block line.
    Code(String),
    /// Ordinary paragraph text.
    Para(Vec<Span>),
    /// Blank separator.
    Blank,
}

/// The help corpus with its optional topic index.
#[derive(Debug, Default)]
pub struct HelpFile {
    corpus: String,
    index: Vec<(String, usize)>,
}

impl HelpFile {
    /// Wrap a corpus, building no index; lookups scan linearly.
    pub fn new(corpus: String) -> HelpFile {
        HelpFile {
            corpus,
            index: Vec::new(),
        }
    }

    /// Wrap a corpus with a prebuilt `(topic, byte offset)` index.
    pub fn with_index(corpus: String, index: Vec<(String, usize)>) -> HelpFile {
        HelpFile { corpus, index }
    }

    /// Build the index by scanning headings once.
    pub fn build_index(&mut self) {
        self.index.clear();
        let mut at = 0;
        for line in self.corpus.lines() {
            if let Some(title) = line.strip_prefix('#') {
                let topic = title.trim_start_matches('#').trim().to_owned();
                self.index.push((topic, at));
            }
            at += line.len() + 1;
        }
    }

    /// Find the byte offset of a topic: indexed lookup first, then a
    /// linear scan of headings.
    pub fn find(&self, topic: &str) -> Option<usize> {
        if !self.index.is_empty() {
            if let Some((_, offset)) = self
                .index
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(topic))
            {
                return Some(*offset);
            }
        }
        let needle = topic.to_lowercase();
        let mut at = 0;
        for line in self.corpus.lines() {
            if line.starts_with('#')
                && line
                    .trim_start_matches('#')
                    .trim()
                    .to_lowercase()
                    .contains(&needle)
            {
                return Some(at);
            }
            at += line.len() + 1;
        }
        None
    }

    /// Stream a topic starting at `offset`, stopping at the next
    /// same-or-higher-level heading, rendered to styled lines.
    pub fn topic(&self, offset: usize) -> Vec<HelpLine> {
        let text = match self.corpus.get(offset..) {
            Some(text) => text,
            None => return Vec::new(),
        };
        let mut lines = text.lines();
        let mut out = Vec::new();
        let level = match lines.next() {
            Some(first) if first.starts_with('#') => {
                let level = first.chars().take_while(|c| *c == '#').count() as u8;
                out.push(HelpLine::Heading(
                    level,
                    first.trim_start_matches('#').trim().to_owned(),
                ));
                level
            }
            Some(first) => {
                out.push(HelpLine::Para(parse_spans(first)));
                u8::MAX
            }
            None => return out,
        };
        let mut in_code = false;
        for line in lines {
            if line.starts_with('#') {
                let next_level = line.chars().take_while(|c| *c == '#').count() as u8;
                if next_level <= level {
                    break;
                }
                out.push(HelpLine::Heading(
                    next_level,
                    line.trim_start_matches('#').trim().to_owned(),
                ));
                continue;
            }
            if line.trim_start().starts_with("```") {
                in_code = !in_code;
                continue;
            }
            if in_code {
                out.push(HelpLine::Code(line.to_owned()));
                continue;
            }
            if line.trim().is_empty() {
                out.push(HelpLine::Blank);
                continue;
            }
            if let Some(item) = line.trim_start().strip_prefix("- ") {
                out.push(HelpLine::Bullet(parse_spans(item)));
                continue;
            }
            if let Some(item) = line.trim_start().strip_prefix("* ") {
                out.push(HelpLine::Bullet(parse_spans(item)));
                continue;
            }
            out.push(HelpLine::Para(parse_spans(line)));
        }
        out
    }
}

/// Parse the inline markup subset: `**bold**`, `*italic*`, `` `code` ``,
/// `[label](target)` links and `![alt](path)` images.
fn parse_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = line;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                flush(&mut spans, &mut plain);
                spans.push(Span::Bold(after[..end].to_owned()));
                rest = &after[end + 2..];
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix('*') {
            if let Some(end) = after.find('*') {
                flush(&mut spans, &mut plain);
                spans.push(Span::Italic(after[..end].to_owned()));
                rest = &after[end + 1..];
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                flush(&mut spans, &mut plain);
                spans.push(Span::Code(after[..end].to_owned()));
                rest = &after[end + 1..];
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix("![") {
            if let Some((_, path, tail)) = link_parts(after) {
                flush(&mut spans, &mut plain);
                spans.push(Span::Image(path));
                rest = tail;
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix('[') {
            if let Some((label, target, tail)) = link_parts(after) {
                flush(&mut spans, &mut plain);
                let command = command_named(&target).is_some();
                spans.push(Span::Link {
                    label,
                    target,
                    command,
                });
                rest = tail;
                continue;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            plain.push(c);
        }
        rest = chars.as_str();
    }
    flush(&mut spans, &mut plain);
    spans
}

fn link_parts(after: &str) -> Option<(String, String, &str)> {
    let close = after.find(']')?;
    let tail = &after[close + 1..];
    let tail = tail.strip_prefix('(')?;
    let end = tail.find(')')?;
    Some((
        after[..close].to_owned(),
        tail[..end].to_owned(),
        &tail[end + 1..],
    ))
}

fn flush(spans: &mut Vec<Span>, plain: &mut String) {
    if !plain.is_empty() {
        spans.push(Span::Text(std::mem::take(plain)));
    }
}
