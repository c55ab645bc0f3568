//! Markdown to styled terminal text
//!
//! Covers the subset chat backends actually produce: headings, paragraphs,
//! lists, block quotes, fenced code, rules and the common inline styles.
//! Rendering never fails; anything that does not parse is shown literally.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Treat every newline inside a paragraph as a line break
    pub breaks: bool,
    /// GitHub flavored extensions (strikethrough, task lists)
    pub gfm: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            breaks: true,
            gfm: true,
        }
    }
}

const RULE_WIDTH: usize = 24;

fn code_style() -> Style {
    Style::default().fg(Color::LightYellow)
}

fn muted_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn render_markdown(text: &str, options: &MarkdownOptions) -> Text<'static> {
    let mut renderer = BlockRenderer::new(options);
    for line in text.lines() {
        renderer.push_line(line);
    }
    renderer.finish()
}

struct BlockRenderer<'a> {
    options: &'a MarkdownOptions,
    lines: Vec<Line<'static>>,
    /// Source lines of the paragraph being collected (only when `breaks` is off)
    paragraph: Vec<String>,
    /// Fence marker of the open code block, if any
    fence: Option<String>,
}

impl<'a> BlockRenderer<'a> {
    fn new(options: &'a MarkdownOptions) -> Self {
        Self {
            options,
            lines: Vec::new(),
            paragraph: Vec::new(),
            fence: None,
        }
    }

    fn push_line(&mut self, raw: &str) {
        if let Some(marker) = &self.fence {
            if raw.trim_start().starts_with(marker.as_str()) {
                self.fence = None;
            } else {
                self.lines.push(Line::from(Span::styled(
                    format!("  {}", raw),
                    code_style(),
                )));
            }
            return;
        }

        let trimmed = raw.trim_start();
        let indent = raw.len() - trimmed.len();

        if trimmed.is_empty() {
            self.flush_paragraph();
            self.blank_line();
            return;
        }

        if let Some(marker) = fence_marker(trimmed) {
            self.flush_paragraph();
            self.fence = Some(marker);
            return;
        }

        if let Some((level, title)) = heading(trimmed) {
            self.flush_paragraph();
            let mut style = Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
            if level == 1 {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            self.lines.push(Line::from(parse_inline(title, style, self.options)));
            return;
        }

        if is_thematic_break(trimmed) {
            self.flush_paragraph();
            self.lines
                .push(Line::from(Span::styled("─".repeat(RULE_WIDTH), muted_style())));
            return;
        }

        if let Some(quoted) = trimmed.strip_prefix('>') {
            self.flush_paragraph();
            let quoted = quoted.strip_prefix(' ').unwrap_or(quoted);
            let mut spans = vec![Span::styled("│ ", muted_style())];
            spans.extend(parse_inline(
                quoted,
                Style::default().add_modifier(Modifier::ITALIC),
                self.options,
            ));
            self.lines.push(Line::from(spans));
            return;
        }

        if let Some((marker, item)) = list_item(trimmed, self.options) {
            self.flush_paragraph();
            let mut spans = vec![Span::raw(format!("{}{} ", " ".repeat(indent), marker))];
            spans.extend(parse_inline(item, Style::default(), self.options));
            self.lines.push(Line::from(spans));
            return;
        }

        if self.options.breaks {
            self.lines
                .push(Line::from(parse_inline(trimmed, Style::default(), self.options)));
        } else {
            self.paragraph.push(raw.to_string());
        }
    }

    /// Join the collected paragraph lines, honoring hard breaks
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }

        let mut current = String::new();
        let mut joined = Vec::new();
        for raw in std::mem::take(&mut self.paragraph) {
            let hard_break = raw.ends_with("  ") || raw.ends_with('\\');
            let content = raw.trim().trim_end_matches('\\').trim_end();
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(content);
            if hard_break {
                joined.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            joined.push(current);
        }

        for text in joined {
            self.lines
                .push(Line::from(parse_inline(&text, Style::default(), self.options)));
        }
    }

    /// Blank separator line, collapsing runs of them
    fn blank_line(&mut self) {
        let last_is_blank = self.lines.last().map(|l| l.width() == 0).unwrap_or(true);
        if !last_is_blank {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Text<'static> {
        self.flush_paragraph();
        while self.lines.last().map(|l| l.width() == 0).unwrap_or(false) {
            self.lines.pop();
        }
        Text::from(self.lines)
    }
}

fn fence_marker(line: &str) -> Option<String> {
    for fence in ["```", "~~~"] {
        if line.starts_with(fence) {
            let ch = fence.chars().next()?;
            let len = line.chars().take_while(|c| *c == ch).count();
            return Some(ch.to_string().repeat(len));
        }
    }
    None
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level, ""));
    }
    let title = rest.strip_prefix(' ')?;
    Some((level, title.trim().trim_end_matches('#').trim_end()))
}

fn is_thematic_break(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && matches!(compact[0], '-' | '*' | '_')
        && compact.iter().all(|c| *c == compact[0])
}

/// Split a list item into its display marker and its text
fn list_item<'t>(line: &'t str, options: &MarkdownOptions) -> Option<(String, &'t str)> {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(item) = line.strip_prefix(bullet) {
            if options.gfm {
                if let Some(rest) = item.strip_prefix("[ ] ") {
                    return Some(("☐".to_string(), rest));
                }
                if let Some(rest) = item
                    .strip_prefix("[x] ")
                    .or_else(|| item.strip_prefix("[X] "))
                {
                    return Some(("☑".to_string(), rest));
                }
            }
            return Some(("•".to_string(), item));
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = &line[digits..];
    let delimiter = rest.chars().next()?;
    if delimiter != '.' && delimiter != ')' {
        return None;
    }
    let item = rest[1..].strip_prefix(' ')?;
    Some((format!("{}.", &line[..digits]), item))
}

fn is_escapable(c: char) -> bool {
    c.is_ascii_punctuation()
}

/// Find the closing delimiter for an emphasis run opened just before `from`
fn find_closing(chars: &[char], from: usize, delim: char, len: usize) -> Option<usize> {
    let mut j = from + 1;
    while j + len <= chars.len() {
        if chars[j] == '\\' {
            j += 2;
            continue;
        }
        if chars[j] == '`' {
            if let Some(end) = find_char(chars, j + 1, '`') {
                j = end + 1;
                continue;
            }
        }
        let run = chars[j..j + len].iter().all(|c| *c == delim);
        let before = chars[j - 1];
        if run && !before.is_whitespace() && before != delim {
            let after = chars.get(j + len).copied();
            let continues = after == Some(delim);
            let intraword = delim == '_' && after.is_some_and(|c| c.is_alphanumeric());
            // a trailing `***` closes the double run first
            if !intraword && (!continues || len == 2) {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    (from..chars.len()).find(|&i| chars[i] == target)
}

/// Parse inline markup into spans layered on top of `base`
fn parse_inline(text: &str, base: Style, options: &MarkdownOptions) -> Vec<Span<'static>> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current_text = String::new();
    let mut i = 0;

    macro_rules! flush {
        () => {
            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), base));
            }
        };
    }

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if chars.get(i + 1).copied().map(is_escapable).unwrap_or(false) => {
                current_text.push(chars[i + 1]);
                i += 2;
            }
            '`' => {
                if let Some(end) = find_char(&chars, i + 1, '`').filter(|&end| end > i + 1) {
                    flush!();
                    let code: String = chars[i + 1..end].iter().collect();
                    spans.push(Span::styled(code, base.patch(code_style())));
                    i = end + 1;
                } else {
                    current_text.push(c);
                    i += 1;
                }
            }
            '*' | '_' | '~' => {
                let doubled = chars.get(i + 1) == Some(&c);
                let len = if doubled { 2 } else { 1 };
                let allowed = match c {
                    '~' => options.gfm && doubled,
                    '_' => i == 0 || !chars[i - 1].is_alphanumeric(),
                    _ => true,
                };
                let open = i + len;
                let opens = allowed
                    && chars
                        .get(open)
                        .map(|next| !next.is_whitespace())
                        .unwrap_or(false);

                if let Some(end) = opens
                    .then(|| find_closing(&chars, open, c, len))
                    .flatten()
                {
                    flush!();
                    let modifier = match (c, doubled) {
                        ('~', _) => Modifier::CROSSED_OUT,
                        (_, true) => Modifier::BOLD,
                        (_, false) => Modifier::ITALIC,
                    };
                    let inner: String = chars[open..end].iter().collect();
                    spans.extend(parse_inline(&inner, base.add_modifier(modifier), options));
                    i = end + len;
                } else {
                    // No closing delimiter, treat as literal
                    current_text.extend(&chars[i..open.min(chars.len())]);
                    i = open;
                }
            }
            '[' => match link(&chars, i) {
                Some((label, url, next)) => {
                    flush!();
                    spans.extend(parse_inline(
                        &label,
                        base.add_modifier(Modifier::UNDERLINED),
                        options,
                    ));
                    if url != label && !url.is_empty() {
                        spans.push(Span::styled(format!(" ({})", url), base.patch(muted_style())));
                    }
                    i = next;
                }
                None => {
                    current_text.push(c);
                    i += 1;
                }
            },
            _ => {
                current_text.push(c);
                i += 1;
            }
        }
    }

    flush!();
    spans
}

/// Parse `[label](url)` starting at `start`; returns label, url and the index after it
fn link(chars: &[char], start: usize) -> Option<(String, String, usize)> {
    let close = find_char(chars, start + 1, ']')?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let end = find_char(chars, close + 2, ')')?;
    let label: String = chars[start + 1..close].iter().collect();
    let url: String = chars[close + 2..end].iter().collect();
    if label.is_empty() {
        return None;
    }
    Some((label, url.trim().to_string(), end + 1))
}
