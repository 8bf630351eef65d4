use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode};
use tracing::trace;

use crate::domain::{JTConfig, JTError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &JTConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    // Poll for the next terminal event. The poll timeout doubles as the
    // tick that drives the model's debounce timer.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, JTError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('s') => Some(Message::ToggleSort),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('y') | KeyCode::Enter => Some(Message::Copy),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
