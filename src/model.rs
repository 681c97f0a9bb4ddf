use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use crate::domain::{Message, SVConfig, SVError};
use crate::export::{
    self, ExportCompletion, ExportFormat, ExportOutcome, ExportService, ExportTracker,
};
use crate::inputter::{InputResult, Inputter};
use crate::json_view::{self, JsonViewer, ViewMode};
use crate::record::{RecordSet, Summary};
use crate::reorder::DropOutcome;
use crate::table::ShipmentTable;
use crate::ui::{COLUMN_MARGIN, TABLE_CHROME_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modus {
    TABLE,
    DRAG,
    PICKER,
    CMDINPUT,
    POPUP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created: Instant,
}

/// Cursor into the displayed part of the grid. `row` indexes displayed rows,
/// `column` indexes displayed columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCursor {
    pub row: usize,
    pub column: usize,
    pub offset_row: usize,
    pub offset_column: usize,
}

pub struct Model {
    config: SVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    view: View,
    table: ShipmentTable,
    viewer: JsonViewer,
    summary: Option<Summary>,
    cursor: TableCursor,
    picker_cursor: usize,
    input: Inputter,
    last_input: InputResult,
    filter_before_edit: Option<String>,
    notification: Option<Notification>,
    clipboard: Option<Clipboard>,
    exporter: Arc<dyn ExportService>,
    exports: ExportTracker,
    sender: Sender<Message>,
    ui_width: usize,
    page_height: usize,
}

impl Model {
    pub fn init(
        config: &SVConfig,
        exporter: Arc<dyn ExportService>,
        sender: Sender<Message>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            view: View::Table,
            table: ShipmentTable::default(),
            viewer: JsonViewer::default(),
            summary: None,
            cursor: TableCursor::default(),
            picker_cursor: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            filter_before_edit: None,
            notification: None,
            clipboard: None,
            exporter,
            exports: ExportTracker::default(),
            sender,
            ui_width,
            page_height: ui_height.saturating_sub(TABLE_CHROME_HEIGHT).max(1),
        }
    }

    /// Replaces whatever was shown with a freshly loaded result set.
    pub fn load(&mut self, set: RecordSet, load_time: Duration) {
        self.summary = Some(set.summary(load_time));
        self.table.load(set.records);
        self.viewer = JsonViewer::default();
        self.render_json();
        self.cursor = TableCursor::default();
        self.picker_cursor = 0;
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::TABLE;
        info!(
            "Showing {} records",
            self.table.grid().record_count()
        );
    }

    // -------------------- Accessors for the ui ---------------------- //

    pub fn table(&self) -> &ShipmentTable {
        &self.table
    }

    pub fn viewer(&self) -> &JsonViewer {
        &self.viewer
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn cursor(&self) -> TableCursor {
        self.cursor
    }

    pub fn picker_cursor(&self) -> usize {
        self.picker_cursor
    }

    pub fn input(&self) -> &InputResult {
        &self.last_input
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn config(&self) -> &SVConfig {
        &self.config
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    /// Ids of the columns currently on screen, in display order.
    pub fn displayed_columns(&self) -> Vec<String> {
        self.table
            .grid()
            .displayed_headers()
            .map(|h| h.column_id.clone())
            .collect()
    }

    pub fn current_column(&self) -> Option<String> {
        self.displayed_columns().get(self.cursor.column).cloned()
    }

    /// Number of columns that fit next to each other at the current width.
    pub fn columns_per_page(&self) -> usize {
        (self.ui_width / (self.config.max_column_width + COLUMN_MARGIN)).max(1)
    }

    /// Chars a raw JSON line holds inside the view border.
    pub fn json_width(&self) -> usize {
        self.ui_width.saturating_sub(2).max(1)
    }

    fn render_json(&mut self) {
        let width = self.json_width();
        if let Err(e) = self.viewer.render(self.table.records(), width) {
            error!("Could not render records as JSON: {e}");
            self.notify(NotificationLevel::Error, format!("Could not show JSON: {e}"));
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}",
            self.ui_width, width, height
        );
        self.ui_width = width;
        self.page_height = height.saturating_sub(TABLE_CHROME_HEIGHT).max(1);
        self.clamp_cursor();
        if self.viewer.mode() == ViewMode::Raw && self.viewer.width() != self.json_width() {
            self.render_json();
        }
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), SVError> {
        self.expire_notification();

        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        // Handled the same way in every modus.
        let msg = match msg {
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return Ok(());
            }
            Message::ExportFinished(completion) => {
                self.export_finished(completion);
                return Ok(());
            }
            other => other,
        };

        match self.modus {
            Modus::TABLE => match (self.view, msg) {
                (_, Message::Quit) => self.quit(),
                (_, Message::Help) => self.show_help(),
                (_, Message::SwitchView) => self.switch_view(),
                (_, Message::Exit) => self.notification = None,
                (View::Table, msg) => self.table_message(msg),
                (View::Json, msg) => self.json_message(msg),
            },
            Modus::DRAG => match msg {
                Message::Quit => self.quit(),
                Message::MoveLeft => self.move_column(-1),
                Message::MoveRight => self.move_column(1),
                Message::MoveBeginning => self.move_column(isize::MIN),
                Message::MoveEnd => self.move_column(isize::MAX),
                Message::Enter | Message::StartDrag => self.drop_column(),
                Message::Exit => self.cancel_drag(),
                _ => (),
            },
            Modus::PICKER => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_picker(-1),
                Message::MoveDown => self.move_picker(1),
                Message::MovePageUp => self.move_picker(-(self.page_height as isize)),
                Message::MovePageDown => self.move_picker(self.page_height as isize),
                Message::MoveBeginning => self.move_picker(isize::MIN),
                Message::MoveEnd => self.move_picker(isize::MAX),
                Message::Select | Message::Enter => self.toggle_picked_column(),
                Message::Exit | Message::ColumnPicker => self.exit(),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help | Message::Enter => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn table_message(&mut self, msg: Message) {
        match msg {
            Message::MoveUp => self.move_row(-1),
            Message::MoveDown => self.move_row(1),
            Message::MovePageUp => self.move_row(-(self.page_height as isize)),
            Message::MovePageDown => self.move_row(self.page_height as isize),
            Message::MoveBeginning => self.move_row(isize::MIN),
            Message::MoveEnd => self.move_row(isize::MAX),
            Message::MoveLeft => self.move_column(-1),
            Message::MoveRight => self.move_column(1),
            Message::StartDrag => self.start_drag(),
            Message::ColumnPicker => self.open_picker(),
            Message::Filter => self.enter_cmd_mode(),
            Message::ClearFilter => {
                self.table.clear_filter();
                self.clamp_cursor();
            }
            Message::Export(format) => self.export(format),
            _ => (),
        }
    }

    fn json_message(&mut self, msg: Message) {
        match msg {
            Message::MoveUp => self.viewer.scroll_by(-1),
            Message::MoveDown => self.viewer.scroll_by(1),
            Message::MovePageUp => self.viewer.scroll_by(-(self.page_height as isize)),
            Message::MovePageDown => self.viewer.scroll_by(self.page_height as isize),
            Message::MoveBeginning => self.viewer.scroll_to(0),
            Message::MoveEnd => self.viewer.scroll_to(usize::MAX),
            Message::ToggleRaw => {
                if let Err(e) = self.viewer.toggle(self.table.records()) {
                    error!("Could not render records as JSON: {e}");
                    self.notify(NotificationLevel::Error, format!("Could not show JSON: {e}"));
                }
            }
            Message::CopyJson => self.copy_json(),
            Message::DownloadJson => self.download_json(),
            Message::Export(format) => self.export(format),
            _ => (),
        }
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP | Modus::PICKER => {
                trace!("Closing {:?}", self.modus);
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.clamp_cursor();
            }
            Modus::TABLE | Modus::DRAG | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn switch_view(&mut self) {
        self.view = match self.view {
            View::Table => View::Json,
            View::Json => View::Table,
        };
        trace!("Switched to {:?} view", self.view);
    }

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => error!("{message}"),
            _ => debug!("{message}"),
        }
        self.notification = Some(Notification {
            level,
            message,
            created: Instant::now(),
        });
    }

    fn expire_notification(&mut self) {
        if let Some(n) = &self.notification
            && n.created.elapsed() >= self.config.notification_ttl
        {
            self.notification = None;
        }
    }

    // -------------------- Table navigation ---------------------- //

    fn move_row(&mut self, step: isize) {
        let rows = self.table.grid().displayed_count();
        if rows == 0 {
            return;
        }
        self.cursor.row = self
            .cursor
            .row
            .saturating_add_signed(step)
            .min(rows - 1);
        self.scroll_rows();
    }

    fn move_column(&mut self, step: isize) {
        let columns = self.displayed_columns().len();
        if columns == 0 {
            return;
        }
        self.cursor.column = self
            .cursor
            .column
            .saturating_add_signed(step)
            .min(columns - 1);
        self.scroll_columns();
        if self.modus == Modus::DRAG
            && let Some(target) = self.current_column()
        {
            self.table.hover(&target);
        }
    }

    fn scroll_rows(&mut self) {
        let page = self.page_height.max(1);
        if self.cursor.row < self.cursor.offset_row {
            self.cursor.offset_row = self.cursor.row;
        } else if self.cursor.row >= self.cursor.offset_row + page {
            self.cursor.offset_row = self.cursor.row + 1 - page;
        }
    }

    fn scroll_columns(&mut self) {
        let page = self.columns_per_page();
        if self.cursor.column < self.cursor.offset_column {
            self.cursor.offset_column = self.cursor.column;
        } else if self.cursor.column >= self.cursor.offset_column + page {
            self.cursor.offset_column = self.cursor.column + 1 - page;
        }
    }

    // Keeps the cursor inside the grid after rows or columns disappear.
    fn clamp_cursor(&mut self) {
        let rows = self.table.grid().displayed_count();
        let columns = self.displayed_columns().len();
        self.cursor.row = self.cursor.row.min(rows.saturating_sub(1));
        self.cursor.column = self.cursor.column.min(columns.saturating_sub(1));
        self.cursor.offset_row = self.cursor.offset_row.min(self.cursor.row);
        self.cursor.offset_column = self.cursor.offset_column.min(self.cursor.column);
        self.scroll_rows();
        self.scroll_columns();
    }

    // -------------------- Column reorder ---------------------- //

    fn start_drag(&mut self) {
        let Some(column) = self.current_column() else {
            return;
        };
        self.table.start_drag(&column);
        self.table.hover(&column);
        self.previous_modus = self.modus;
        self.modus = Modus::DRAG;
    }

    fn drop_column(&mut self) {
        let Some(target) = self.current_column() else {
            self.cancel_drag();
            return;
        };
        match self.table.drop_on(&target) {
            DropOutcome::Moved { source, .. } => {
                if let Some(idx) = self.displayed_columns().iter().position(|c| *c == source) {
                    self.cursor.column = idx;
                }
                self.scroll_columns();
            }
            outcome => trace!("Drop on {target}: {outcome:?}"),
        }
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::DRAG;
    }

    fn cancel_drag(&mut self) {
        let source = self.table.drag().source().map(str::to_string);
        self.table.end_drag();
        if let Some(source) = source
            && let Some(idx) = self.displayed_columns().iter().position(|c| *c == source)
        {
            self.cursor.column = idx;
            self.scroll_columns();
        }
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::DRAG;
    }

    // -------------------- Column visibility ---------------------- //

    fn open_picker(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::PICKER;
        self.picker_cursor = self.picker_cursor.min(self.table.columns().len().saturating_sub(1));
    }

    fn move_picker(&mut self, step: isize) {
        let columns = self.table.columns().len();
        if columns == 0 {
            return;
        }
        self.picker_cursor = self.picker_cursor.saturating_add_signed(step).min(columns - 1);
    }

    fn toggle_picked_column(&mut self) {
        let Some(id) = self
            .table
            .columns()
            .columns()
            .get(self.picker_cursor)
            .map(|c| c.id.clone())
        else {
            return;
        };
        if let Some(visible) = self.table.toggle_visible(&id) {
            trace!("Picker set {id} visible={visible}");
        }
    }

    // -------------------- Row filter ---------------------- //

    fn enter_cmd_mode(&mut self) {
        trace!("Entering filter input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.filter_before_edit = self.table.grid().filter().map(str::to_string);
        self.input.set(self.filter_before_edit.as_deref().unwrap_or(""));
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.canceled {
            match self.filter_before_edit.take() {
                Some(term) => self.table.apply_filter(&term),
                None => self.table.clear_filter(),
            }
        } else if self.last_input.changed {
            let term = self.last_input.input.clone();
            self.table.apply_filter(&term);
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
        self.cursor.row = 0;
        self.cursor.offset_row = 0;
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle filter input {:?}", self.last_input.input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.filter_before_edit = None;
        self.input.clear();
        self.clamp_cursor();
    }

    // -------------------- Export ---------------------- //

    fn export(&mut self, format: ExportFormat) {
        let columns = export::visible_columns(self.table.columns());
        let rows = export::collect_visible_data(self.table.grid(), &columns);
        let superseded = self.exports.pending(format);
        let ticket = self.exports.issue(format);
        info!("Exporting {} rows to {format} (ticket {ticket})", rows.len());
        match export::spawn_export(
            self.exporter.clone(),
            format,
            ticket,
            rows,
            self.sender.clone(),
        ) {
            Ok(_) if superseded => self.notify(
                NotificationLevel::Info,
                format!("{format} export already running, keeping only this one..."),
            ),
            Ok(_) => self.notify(NotificationLevel::Info, format!("Exporting to {format}...")),
            Err(e) => self.notify(
                NotificationLevel::Error,
                format!("Error exporting to {format}: {e}"),
            ),
        }
    }

    fn export_finished(&mut self, completion: ExportCompletion) {
        let format = completion.format;
        let Some(outcome) = self.exports.settle(completion) else {
            return;
        };
        match outcome {
            ExportOutcome::Download { artifact, fallback } => {
                match export::save_download(&self.config.download_dir, &artifact) {
                    Ok(path) if fallback => self.notify(
                        NotificationLevel::Success,
                        format!("{format} generated locally: {}", path.display()),
                    ),
                    Ok(path) => self.notify(
                        NotificationLevel::Success,
                        format!("{format} export saved to {}", path.display()),
                    ),
                    Err(e) => self.notify(
                        NotificationLevel::Error,
                        format!("Could not save {}: {e}", artifact.filename),
                    ),
                }
            }
            ExportOutcome::Link { url } => {
                self.notify(NotificationLevel::Success, format!("{format} ready at {url}"))
            }
            ExportOutcome::Completed { message } => {
                self.notify(NotificationLevel::Success, message)
            }
            ExportOutcome::Notice { message } => self.notify(NotificationLevel::Info, message),
            ExportOutcome::Failed { message } => self.notify(NotificationLevel::Error, message),
        }
    }

    // -------------------- JSON view ---------------------- //

    fn copy_json(&mut self) {
        let text = match self.viewer.copy_text(self.table.records()) {
            Ok(Some(text)) => text,
            Ok(None) => return self.notify(NotificationLevel::Info, json_view::NO_DATA_TEXT),
            Err(e) => return self.notify(NotificationLevel::Error, format!("Copy failed: {e}")),
        };
        match self.set_clipboard(text) {
            Ok(()) => self.notify(NotificationLevel::Success, "Copied to clipboard!"),
            Err(e) => self.notify(NotificationLevel::Error, format!("Copy failed: {e}")),
        }
    }

    fn set_clipboard(&mut self, text: String) -> Result<(), SVError> {
        let clipboard = match self.clipboard.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new()?,
        };
        let clipboard = self.clipboard.insert(clipboard);
        clipboard.set_text(text)?;
        trace!("Copied JSON to clipboard.");
        Ok(())
    }

    fn download_json(&mut self) {
        let artifact = match self.viewer.download_artifact(self.table.records()) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return self.notify(NotificationLevel::Info, json_view::NO_DATA_TEXT),
            Err(e) => {
                return self.notify(NotificationLevel::Error, format!("Download failed: {e}"));
            }
        };
        match export::save_download(&self.config.download_dir, &artifact) {
            Ok(path) => self.notify(
                NotificationLevel::Success,
                format!("Downloaded {}", path.display()),
            ),
            Err(e) => self.notify(NotificationLevel::Error, format!("Download failed: {e}")),
        }
    }
}
