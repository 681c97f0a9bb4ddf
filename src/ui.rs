use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
        TableState as GridState,
    },
};

use crate::domain::HELP_TEXT;
use crate::grid::{EMPTY_MARKER, HeaderCell};
use crate::json_view::{JsonView, NO_DATA_TEXT, TokenKind};
use crate::model::{Modus, Model, NotificationLevel, View};

pub const COLUMN_MARGIN: usize = 1;
// Header line, table borders, column header row and status line.
pub const TABLE_CHROME_HEIGHT: usize = 5;
const NO_VISIBLE_COLUMNS_TEXT: &str = "No visible columns";

#[derive(Debug, Default)]
pub struct TableUI {
    grid_state: GridState,
    picker_state: ListState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let [header, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_header(model, frame, header);
        match model.view() {
            View::Table => self.draw_table(model, frame, body),
            View::Json => self.draw_json(model, frame, body),
        }
        self.draw_status(model, frame, status);

        match model.modus() {
            Modus::PICKER => self.draw_picker(model, frame, body),
            Modus::POPUP => self.draw_help(frame, body),
            _ => {}
        }
    }

    fn draw_header(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(" shipview ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("│ "),
        ];
        if let Some(summary) = model.summary() {
            spans.push(Span::raw(summary.as_line()));
            spans.push(Span::raw(" │ "));
        }
        spans.push(Span::styled(
            model.table().grid().record_count_text(),
            Style::default().fg(Color::Cyan),
        ));
        let (table_tab, json_tab) = match model.view() {
            View::Table => (" Table ".reversed(), " JSON ".dim()),
            View::Json => (" Table ".dim(), " JSON ".reversed()),
        };
        spans.extend([Span::raw(" │ "), table_tab, json_tab]);
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    // -------------------- Table ---------------------- //

    fn draw_table(&mut self, model: &Model, frame: &mut Frame, area: Rect) {
        let grid = model.table().grid();
        let title = match grid.filter() {
            Some(term) => format!(" Shipments [/{term}] "),
            None => " Shipments ".to_string(),
        };
        let block = Block::default().title(title).borders(Borders::ALL);

        let empty_text = grid
            .placeholder
            .as_deref()
            .or((!grid.has_displayed_columns()).then_some(NO_VISIBLE_COLUMNS_TEXT));
        if let Some(text) = empty_text {
            let paragraph = Paragraph::new(text.dim()).centered().block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let cursor = model.cursor();
        let page_height = (area.height as usize).saturating_sub(3);
        let width = model.config().max_column_width;
        let headers: Vec<&HeaderCell> = grid
            .displayed_headers()
            .skip(cursor.offset_column)
            .take(model.columns_per_page())
            .collect();

        let drag = model.table().drag();
        let header = Row::new(headers.iter().map(|h| {
            let style = if drag.source() == Some(h.column_id.as_str()) {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else if drag.hover_target() == Some(h.column_id.as_str()) {
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::UNDERLINED)
            } else {
                Style::default()
            };
            Cell::from(h.label.clone()).style(style)
        }))
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = grid
            .displayed_rows()
            .skip(cursor.offset_row)
            .take(page_height)
            .map(|row| {
                Row::new(headers.iter().map(|h| match row.cell(&h.column_id) {
                    Some(cell) if !cell.is_empty => Cell::from(cell.value.clone()),
                    _ => Cell::from(EMPTY_MARKER.dim()),
                }))
            });

        let widths = vec![Constraint::Length(width as u16); headers.len()];
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(COLUMN_MARGIN as u16)
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .column_highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .cell_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        self.grid_state
            .select(Some(cursor.row.saturating_sub(cursor.offset_row)));
        self.grid_state
            .select_column(Some(cursor.column.saturating_sub(cursor.offset_column)));
        *self.grid_state.offset_mut() = 0;
        frame.render_stateful_widget(table, area, &mut self.grid_state);
    }

    fn draw_picker(&mut self, model: &Model, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = model
            .table()
            .columns()
            .columns()
            .iter()
            .map(|c| {
                let mark = if c.visible { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {}", c.display_name))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Columns [Space:toggle Esc:close] ")
                    .borders(Borders::ALL),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let popup = centered(area, 44, area.height.saturating_sub(2));
        self.picker_state.select(Some(model.picker_cursor()));
        frame.render_widget(Clear, popup);
        frame.render_stateful_widget(list, popup, &mut self.picker_state);
    }

    // -------------------- JSON ---------------------- //

    fn draw_json(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let viewer = model.viewer();
        // Only the visible window is handed to ratatui, the scroll offset can
        // exceed what `Paragraph::scroll` takes.
        let start = viewer.scroll();
        let height = area.height.saturating_sub(2) as usize;
        let (mode, paragraph) = match viewer.view() {
            JsonView::Empty => ("", Paragraph::new(NO_DATA_TEXT.dim()).centered()),
            JsonView::Raw(lines) => {
                let lines: Vec<Line> = lines
                    .iter()
                    .skip(start)
                    .take(height)
                    .map(|l| Line::raw(l.as_str()))
                    .collect();
                ("raw", Paragraph::new(lines))
            }
            JsonView::Formatted(lines) => {
                let lines: Vec<Line> = lines
                    .iter()
                    .skip(start)
                    .take(height)
                    .map(|tokens| {
                        Line::from(
                            tokens
                                .iter()
                                .map(|t| Span::styled(t.text.as_str(), token_style(t.kind)))
                                .collect::<Vec<Span>>(),
                        )
                    })
                    .collect();
                ("formatted", Paragraph::new(lines))
            }
        };
        let title = format!(" JSON {mode} [r:toggle y:copy d:download] ");
        let paragraph = paragraph.block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    // -------------------- Status line and help ---------------------- //

    fn draw_status(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if model.modus() == Modus::CMDINPUT {
            let input = model.input();
            frame.render_widget(Paragraph::new(format!("/{}", input.input)), area);
            let prefix: usize = input
                .input
                .chars()
                .take(input.cursor)
                .map(|c| if c.is_ascii() { 1 } else { 2 })
                .sum();
            frame.set_cursor_position((area.x + 1 + prefix as u16, area.y));
            return;
        }

        if let Some(notification) = model.notification() {
            let style = match notification.level {
                NotificationLevel::Info => Style::default().fg(Color::Cyan),
                NotificationLevel::Success => Style::default().fg(Color::Green),
                NotificationLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            };
            let text = format!(" {} ", notification.message);
            frame.render_widget(Paragraph::new(text).style(style), area);
            return;
        }

        let hints = match (model.modus(), model.view()) {
            (Modus::DRAG, _) => " ←/→:pick target  Enter:drop  Esc:cancel",
            (Modus::PICKER, _) => " ↑/↓:select  Space:toggle  Esc:close",
            (Modus::POPUP, _) => " Esc:close",
            (_, View::Table) => " m:move  v:columns  /:filter  x/c/J:export  Tab:JSON  ?:help  q:quit",
            (_, View::Json) => " r:raw/formatted  y:copy  d:download  Tab:table  ?:help  q:quit",
        };
        frame.render_widget(Paragraph::new(hints.dim()), area);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let height = HELP_TEXT.lines().count() as u16 + 2;
        let popup = centered(area, 64, height);
        let paragraph = Paragraph::new(HELP_TEXT).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
        frame.render_widget(Clear, popup);
        frame.render_widget(paragraph, popup);
    }
}

fn token_style(kind: TokenKind) -> Style {
    match kind {
        TokenKind::Key => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        TokenKind::Str => Style::default().fg(Color::Green),
        TokenKind::Number => Style::default().fg(Color::Yellow),
        TokenKind::Bool => Style::default().fg(Color::Magenta),
        TokenKind::Null => Style::default().fg(Color::Red).add_modifier(Modifier::DIM),
        TokenKind::Punct | TokenKind::Whitespace => Style::default(),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, SVConfig};
    use crate::export::OfflineExportService;
    use crate::record::{Record, RecordSet};
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    fn model(records: Vec<Record>) -> Model {
        let (tx, _rx) = mpsc::channel();
        let mut model = Model::init(&SVConfig::default(), Arc::new(OfflineExportService), tx, 120, 20);
        model.load(RecordSet::new(records, 1), Duration::from_millis(200));
        model
    }

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        let mut ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn table_shows_labels_and_markers() {
        let screen = render(&model(vec![
            Record::new().with("office_name", "LA").with("batch_no", ""),
        ]));
        assert!(screen.contains("Office"));
        assert!(screen.contains("Batch no"));
        assert!(screen.contains("LA"));
        assert!(screen.contains("1 record"));
    }

    #[test]
    fn empty_result_shows_placeholder() {
        let screen = render(&model(vec![]));
        assert!(screen.contains(crate::grid::NO_DATA_TEXT));
    }

    #[test]
    fn json_view_shows_keys() {
        let mut model = model(vec![Record::new().with("vessel", "MAERSK")]);
        model.update(Some(Message::SwitchView)).unwrap();
        let screen = render(&model);
        assert!(screen.contains("\"vessel\": \"MAERSK\""));
    }

    #[test]
    fn json_view_reaches_lines_beyond_u16() {
        let records: Vec<Record> = (0..22_000)
            .map(|i| Record::new().with("batch_no", format!("B{i}")))
            .collect();
        let mut model = model(records);
        model.update(Some(Message::SwitchView)).unwrap();
        assert!(model.viewer().line_count() > u16::MAX as usize);
        model.update(Some(Message::MoveEnd)).unwrap();
        model.update(Some(Message::MoveUp)).unwrap();
        model.update(Some(Message::MoveUp)).unwrap();
        assert!(render(&model).contains("\"batch_no\": \"B21999\""));
    }

    #[test]
    fn raw_json_shows_scrolled_window() {
        let records: Vec<Record> = (0..200)
            .map(|i| Record::new().with("batch_no", format!("B{i:03}")))
            .collect();
        let mut model = model(records);
        model.update(Some(Message::SwitchView)).unwrap();
        model.update(Some(Message::ToggleRaw)).unwrap();
        model.update(Some(Message::MoveEnd)).unwrap();
        let screen = render(&model);
        assert!(screen.contains("B199"));
        assert!(!screen.contains("\"B000\""));
    }

    #[test]
    fn help_popup_is_drawn() {
        let mut model = model(vec![]);
        model.update(Some(Message::Help)).unwrap();
        assert!(render(&model).contains("Help"));
    }
}
