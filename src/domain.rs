use std::io::Error;

use ratatui::crossterm::event::KeyEvent;

// Crate wide error type. Everything that can go wrong during startup or
// while handling events maps into one of these variants.
#[derive(Debug)]
pub enum JTError {
    IoError(Error),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
}

impl From<Error> for JTError {
    fn from(err: Error) -> Self {
        JTError::IoError(err)
    }
}

impl From<serde_json::Error> for JTError {
    fn from(err: serde_json::Error) -> Self {
        JTError::JsonError(err)
    }
}

#[derive(Debug, Clone)]
pub struct JTConfig {
    // Timeout in ms for the terminal event poll. This tick also drives the
    // search debounce timer.
    pub event_poll_time: u64,
    pub page_size: usize,
    pub debounce_ms: u64,
    pub max_column_width: usize,
}

impl Default for JTConfig {
    fn default() -> Self {
        JTConfig {
            event_poll_time: 100,
            page_size: 100,
            debounce_ms: 300,
            max_column_width: 40,
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    ToggleSort,
    Search,
    Copy,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
jt - json table viewer

  q          quit
  arrows     move cell selection
  n / p      next / previous page
  g / G      first / last page
  s          toggle sort on the selected column
  /          edit the search text
  y / Enter  copy the selected cell's copy group
  Esc        clear the search text
  ?          this help

While editing the search text:
  Enter      keep the text (applies after a short pause)
  Esc        revert to the last applied text
";
