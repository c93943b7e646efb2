use std::time::Duration;
use tracing::trace;

use crate::config::DeskConfig;
use crate::domain::{DeskError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DeskConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DeskError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                Ok(self.handle_key(key, model.raw_keyevents()))
            }
            Event::Resize(width, height) => Ok(Some(Message::Resize(width as usize, height as usize))),
            _ => Ok(None),
        }
    }

    /// Text entry gets every key except Ctrl+C.
    fn handle_key(&self, key: event::KeyEvent, raw: bool) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Message::Quit);
        }
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('[') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Right | KeyCode::Char(']') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Home => Some(Message::FirstPage),
            KeyCode::End => Some(Message::LastPage),
            KeyCode::Tab => Some(Message::NextTab),
            KeyCode::Char('m') => Some(Message::Menu),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('x') => Some(Message::Export),
            KeyCode::Char('y') => Some(Message::CopyRow),
            KeyCode::Char('L') => Some(Message::Logout),
            KeyCode::Char(c @ '1'..='9') => c.to_digit(10).map(|d| Message::Action(d as usize - 1)),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
