use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use arboard::Clipboard;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::models::{Credential, Node};
use crate::tree_view::{row_index, TreeRow};

const CLIPBOARD_CLEAR_AFTER: Duration = Duration::from_secs(20);
const INK: Color = Color::Rgb(0xE4, 0xE0, 0xD0);
const LEAF: Color = Color::Rgb(0x8F, 0xA8, 0x4A);
const SELECTED_BG: Color = Color::Rgb(0x2C, 0x2F, 0x26);

/// Colour family of a modal box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Edit,
    Transfer,
    Caution,
}

impl Tone {
    /// (frame, background)
    fn palette(self) -> (Color, Color) {
        match self {
            Tone::Edit => (LEAF, Color::Rgb(0x1A, 0x20, 0x12)),
            Tone::Transfer => (Color::Rgb(0x5E, 0x8C, 0x9A), Color::Rgb(0x12, 0x1C, 0x21)),
            Tone::Caution => (Color::Rgb(0xC2, 0x7C, 0x3E), Color::Rgb(0x26, 0x18, 0x0E)),
        }
    }
}

/// A centred modal box drawn over the main screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub title: &'static str,
    pub tone: Tone,
    pub lines: Vec<String>,
}

impl Overlay {
    fn area(&self, screen: Rect) -> Rect {
        let widest = self
            .lines
            .iter()
            .map(|line| line.chars().count())
            .chain(std::iter::once(self.title.chars().count()))
            .max()
            .unwrap_or(0);
        let width = (widest as u16 + 4).min(screen.width);
        let height = (self.lines.len() as u16 + 2).min(screen.height);
        Rect::new(
            screen.x + (screen.width - width) / 2,
            screen.y + (screen.height - height) / 2,
            width,
            height,
        )
    }

    fn render(&self, f: &mut Frame<'_>) {
        let area = self.area(f.size());
        let (frame, background) = self.tone.palette();
        let bold_frame = Style::default().fg(frame).add_modifier(Modifier::BOLD);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(bold_frame)
            .title(Span::styled(self.title, bold_frame))
            .style(Style::default().bg(background));
        let body: Vec<Line> = self.lines.iter().map(|l| Line::raw(l.as_str())).collect();
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(body)
                .style(Style::default().fg(INK).bg(background))
                .block(block),
            area,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Detail,
}

pub struct ViewState<'a> {
    pub rows: &'a [TreeRow<'a>],
    pub active: Option<&'a Node>,
    pub moving_title: Option<&'a str>,
    pub focus: Focus,
    pub credential_idx: usize,
    pub dirty: bool,
    pub overlay: Option<Overlay>,
    pub status: String,
}

pub fn mask(value: &str) -> String {
    "•".repeat(value.chars().count())
}

pub fn credential_line(credential: &Credential) -> String {
    let value = if credential.show_value {
        credential.value.clone()
    } else {
        mask(&credential.value)
    };
    let name = if credential.name.is_empty() {
        "(unnamed)"
    } else {
        credential.name.as_str()
    };
    format!("{name}: {value}")
}

fn tree_label(row: &TreeRow<'_>) -> String {
    let marker = match (row.has_children, row.is_expanded) {
        (false, _) => "  ",
        (true, true) => "▾ ",
        (true, false) => "▸ ",
    };
    format!("{}{marker}{}", "  ".repeat(row.depth), row.node.data.title)
}

fn row_highlight(focused: bool) -> Style {
    match focused {
        true => Style::new().fg(LEAF).bg(SELECTED_BG).add_modifier(Modifier::BOLD),
        false => Style::new().fg(Color::Gray).bg(SELECTED_BG),
    }
}

pub fn draw(f: &mut Frame<'_>, state: &ViewState) {
    let [main, footer] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(3)]).areas(f.size());
    let [tree, detail] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(main);

    draw_tree(f, tree, state);
    draw_detail(f, detail, state);
    draw_footer(f, footer, state);

    if let Some(overlay) = &state.overlay {
        overlay.render(f);
    }
}

fn draw_tree(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let title = match state.dirty {
        true => "Items [modified]",
        false => "Items",
    };
    let block = Block::bordered().title(title);
    if state.rows.is_empty() {
        f.render_widget(Paragraph::new("No items yet. Press n to add one.").block(block), area);
        return;
    }

    let list = List::new(state.rows.iter().map(|row| ListItem::new(tree_label(row))))
        .block(block)
        .highlight_symbol("» ")
        .highlight_style(row_highlight(state.focus == Focus::Tree));
    let mut selection =
        ListState::default().with_selected(state.active.and_then(|n| row_index(state.rows, &n.id)));
    f.render_stateful_widget(list, area, &mut selection);
}

fn draw_detail(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let Some(node) = state.active else {
        f.render_widget(
            Paragraph::new("Nothing selected.").block(Block::bordered().title("Details")),
            area,
        );
        return;
    };
    let [heading, list_area, notes] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(4),
    ])
    .areas(area);

    f.render_widget(
        Paragraph::new(node.data.title.as_str())
            .style(Style::new().fg(INK).add_modifier(Modifier::BOLD))
            .block(Block::bordered().title("Title")),
        heading,
    );

    let credentials = &node.data.credentials;
    let selected = state.credential_idx.min(credentials.len().saturating_sub(1));
    if credentials.is_empty() {
        f.render_widget(
            Paragraph::new("No credentials. Tab, then a, adds one.")
                .block(Block::bordered().title("Credentials")),
            list_area,
        );
    } else {
        let list = List::new(credentials.iter().map(|c| ListItem::new(credential_line(c))))
            .block(Block::bordered().title("Credentials"))
            .highlight_symbol("» ")
            .highlight_style(row_highlight(state.focus == Focus::Detail));
        let mut selection = ListState::default().with_selected(Some(selected));
        f.render_stateful_widget(list, list_area, &mut selection);
    }

    let description = credentials
        .get(selected)
        .and_then(|c| c.description.as_deref())
        .unwrap_or("");
    f.render_widget(
        Paragraph::new(description)
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title("Description")),
        notes,
    );
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let line = match state.moving_title {
        Some(title) => Line::from(vec![
            Span::styled(
                format!("Moving '{title}' "),
                Style::new().fg(LEAF).add_modifier(Modifier::BOLD),
            ),
            Span::raw("m: drop under selection | M: drop at top level | Esc: cancel"),
        ]),
        None => Line::raw(state.status.as_str()),
    };
    f.render_widget(Paragraph::new(line).block(Block::bordered()), area);
}

pub fn copy_value_to_clipboard(credential: &Credential) -> Result<()> {
    let mut clipboard =
        Clipboard::new().map_err(|e| anyhow!("No clipboard available: {e}"))?;
    clipboard
        .set_text(credential.value.as_str())
        .map_err(|e| anyhow!("Could not copy to the clipboard: {e}"))?;
    // The clipboard owner has to outlive the copy on some platforms.
    thread::spawn(move || {
        thread::sleep(CLIPBOARD_CLEAR_AFTER);
        clipboard.clear().ok();
    });
    Ok(())
}
