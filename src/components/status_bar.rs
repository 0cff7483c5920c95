use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::fs::tree::{Node, NodeType};
use crate::operation::Operation;

/// One-line status bar: the current directory on the left, the pending
/// operation (with the marked entry and input buffer) on the right. When no
/// operation is pending the right side describes the selected entry.
///
/// A status message, when present, replaces the whole line.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    file_info: &'a str,
    operation: Operation,
    marked_name: Option<&'a str>,
    input: &'a str,
    status_message: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, operation: Operation) -> Self {
        Self {
            path_str,
            file_info: "",
            operation,
            marked_name: None,
            input: "",
            status_message: None,
        }
    }

    pub fn file_info(mut self, info: &'a str) -> Self {
        self.file_info = info;
        self
    }

    pub fn marked_name(mut self, name: Option<&'a str>) -> Self {
        self.marked_name = name;
        self
    }

    pub fn input(mut self, input: &'a str) -> Self {
        self.input = input;
        self
    }

    pub fn status_message(mut self, msg: Option<&'a str>) -> Self {
        self.status_message = msg;
        self
    }

    /// Text describing the pending operation, empty when idle.
    fn operation_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let label = self.operation.label();
        if !label.is_empty() {
            parts.push(label);
        }
        if self.operation.shows_marked() {
            if let Some(name) = self.marked_name {
                parts.push(name);
            }
        }
        if self.operation.is_input() {
            if self.operation == Operation::Rename {
                parts.push("→");
            }
            parts.push(self.input);
        }
        parts.join(" ")
    }
}

/// Human-readable size, e.g. "1.2 KB".
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// `rwxr-xr-x` style rendering of the permission bits.
#[cfg(unix)]
pub fn format_mode(mode: u32) -> String {
    (0..9)
        .map(|i| {
            let bit = 1 << (8 - i);
            match (mode & bit != 0, i % 3) {
                (false, _) => '-',
                (true, 0) => 'r',
                (true, 1) => 'w',
                (true, _) => 'x',
            }
        })
        .collect()
}

/// Summary of one entry: size, kind and (on unix) permissions.
pub fn describe(node: &Node) -> String {
    let kind = match node.node_type {
        NodeType::File => "File",
        NodeType::Directory => "Dir",
        NodeType::Symlink => "Link",
    };
    let mut parts = vec![format_size(node.meta.size), kind.to_string()];
    #[cfg(unix)]
    parts.push(format_mode(node.meta.mode));
    parts.join(" | ")
}

/// Keep the last `max` characters of `s`, marking the cut with "...".
fn truncate_left(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().skip(len - max).collect();
    }
    let tail: String = s.chars().skip(len - (max - 3)).collect();
    format!("...{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = Style::default().bg(Color::Red).fg(Color::White);
            let display: String = msg.chars().take(width).collect();
            let display = format!("{:<width$}", display, width = width);
            buf.set_line(area.x, area.y, &Line::from(Span::styled(display, style)), area.width);
            return;
        }

        let mut op_text = self.operation_text();
        if op_text.is_empty() {
            op_text = self.file_info.to_string();
        }
        let op_len = op_text.chars().count().min(width);
        let path_budget = width.saturating_sub(op_len).saturating_sub(1);
        let path_display = truncate_left(self.path_str, path_budget);
        let gap = width
            .saturating_sub(path_display.chars().count())
            .saturating_sub(op_len);

        let bar = Style::default().bg(Color::DarkGray).fg(Color::White);
        let spans = vec![
            Span::styled(path_display, bar),
            Span::styled(" ".repeat(gap), bar),
            Span::styled(op_text, bar.fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ];
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}
