use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, SVConfig, SVError};
use crate::export::ExportFormat;
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &SVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, SVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    Self::handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    pub fn handle_key(key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char(' '), _) => Some(Message::Select),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Tab, _) => Some(Message::SwitchView),
            (KeyCode::Char('m'), _) => Some(Message::StartDrag),
            (KeyCode::Char('v'), _) => Some(Message::ColumnPicker),
            (KeyCode::Char('/'), _) => Some(Message::Filter),
            (KeyCode::Backspace, _) => Some(Message::ClearFilter),
            (KeyCode::Char('x'), _) => Some(Message::Export(ExportFormat::Excel)),
            (KeyCode::Char('c'), _) => Some(Message::Export(ExportFormat::Csv)),
            (KeyCode::Char('J'), _) => Some(Message::Export(ExportFormat::Json)),
            (KeyCode::Char('r'), _) => Some(Message::ToggleRaw),
            (KeyCode::Char('y'), _) => Some(Message::CopyJson),
            (KeyCode::Char('d'), _) => Some(Message::DownloadJson),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(code: KeyCode) -> Option<Message> {
        Controller::handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn maps_table_keys() {
        assert!(matches!(map(KeyCode::Char('m')), Some(Message::StartDrag)));
        assert!(matches!(map(KeyCode::Char('v')), Some(Message::ColumnPicker)));
        assert!(matches!(map(KeyCode::Tab), Some(Message::SwitchView)));
        assert!(matches!(
            map(KeyCode::Char('c')),
            Some(Message::Export(ExportFormat::Csv))
        ));
        assert!(matches!(
            map(KeyCode::Char('J')),
            Some(Message::Export(ExportFormat::Json))
        ));
        assert!(map(KeyCode::F(5)).is_none());
    }

    #[test]
    fn ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(Controller::handle_key(key), Some(Message::Quit)));
    }
}
