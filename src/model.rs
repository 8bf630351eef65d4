use std::time::{Duration, Instant};

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{info, trace};

use crate::dataset::{CellValue, Dataset, copy_group_text};
use crate::debounce::Debouncer;
use crate::domain::{HELP_TEXT, JTConfig, JTError, Message};
use crate::engine::{self, QueryState, SortDirection, View};
use crate::format;
use crate::inputter::{InputResult, Inputter};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy)]
enum Modus {
    TABLE,
    SEARCH,
    POPUP,
}

// Everything the ui needs to render one frame.
#[derive(Clone)]
pub struct UIData {
    pub title: String,
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    // Formatted cell strings for the current page, row major
    pub rows: Vec<Vec<String>>,
    pub total_matching: usize,
    pub total_pages: usize,
    pub page: usize,
    pub sort_column: Option<usize>,
    pub sort_direction: SortDirection,
    pub selected_row: usize,
    pub selected_column: usize,
    pub search: InputResult,
    pub active_search: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
    pub last_status_message_update: Instant,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            title: String::new(),
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
            total_matching: 0,
            total_pages: 0,
            page: 1,
            sort_column: None,
            sort_direction: SortDirection::Descending,
            selected_row: 0,
            selected_column: 0,
            search: InputResult::default(),
            active_search: false,
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
            last_update: Instant::now(),
        }
    }
}

// The only stateful piece. The dataset is read-only after init, the query
// state mutates in response to messages and the view is recomputed as a
// pure function of the two.
pub struct Model {
    config: JTConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    title: String,
    dataset: Dataset,
    query: QueryState,
    view: View,
    debouncer: Debouncer,
    input: Inputter,
    clipboard: Option<Clipboard>,
    cursor_row: usize,
    cursor_column: usize,
    uidata: UIData,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &JTConfig, dataset: Dataset, title: impl Into<String>) -> Self {
        // Default sort: the last declared field, descending
        let sort_field = dataset.headers.last().map(|h| h.id.clone());
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            title: title.into(),
            dataset,
            query: QueryState {
                sort_field,
                ..QueryState::default()
            },
            view: View::default(),
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            input: Inputter::default(),
            // A missing clipboard means copy actions silently do nothing
            clipboard: Clipboard::new().ok(),
            cursor_row: 0,
            cursor_column: 0,
            uidata: UIData::empty(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.recompute();
        if model.dataset.data.is_empty() {
            model.set_status_message("No data loaded".to_string());
        } else {
            model.set_status_message(format!("Loaded {} records", model.dataset.data.len()));
        }
        info!(
            "Model ready: {} records, {} fields",
            model.dataset.data.len(),
            model.dataset.headers.len()
        );
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    // While the search box is active all key events go to the line editor.
    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::SEARCH)
    }

    pub fn quit(&mut self) {
        // Drop any pending search commit on teardown
        self.debouncer.cancel();
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), JTError> {
        // The event poll tick drives the debounce. A quiescent search text
        // commits here, independent of any message.
        if let Some(text) = self.debouncer.poll() {
            self.commit_search(text);
        }

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_cursor_row(-1),
                    Message::MoveDown => self.move_cursor_row(1),
                    Message::MoveLeft => self.move_cursor_column(-1),
                    Message::MoveRight => self.move_cursor_column(1),
                    Message::NextPage => self.set_page(self.query.page + 1),
                    Message::PrevPage => self.set_page(self.query.page.saturating_sub(1)),
                    Message::FirstPage => self.set_page(1),
                    Message::LastPage => self.set_page(usize::MAX),
                    Message::ToggleSort => self.toggle_sort(),
                    Message::Search => self.enter_search(),
                    Message::Copy => self.copy_cell(),
                    Message::Help => self.show_help(),
                    Message::Exit => self.clear_search(),
                    Message::Resize(_, _) => self.refresh_uidata(),
                    Message::RawKey(_) => (),
                },
                Modus::SEARCH => {
                    if let Message::RawKey(key) = msg {
                        self.search_input(key);
                    }
                }
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Help => self.close_popup(),
                    Message::Resize(_, _) => self.refresh_uidata(),
                    _ => (),
                },
            }
        }

        Ok(())
    }

    // -------------------- Search handling ---------------------- //

    fn enter_search(&mut self) {
        trace!("Entering search input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCH;
        self.input.clear();
        self.input.set(&self.query.raw_search);
        self.refresh_uidata();
    }

    fn leave_search(&mut self) {
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::SEARCH;
    }

    fn search_input(&mut self, key: KeyEvent) {
        let result = self.input.read(key);
        if result.canceled {
            // Esc reverts the echo to the last applied text
            self.debouncer.cancel();
            self.query.raw_search = self.query.committed_search.clone();
            self.leave_search();
        } else if result.finished {
            // Enter keeps the text, the pending commit fires after the
            // quiescence window
            self.query.raw_search = result.input;
            self.leave_search();
        } else if result.input != self.query.raw_search {
            self.query.raw_search = result.input.clone();
            if result.input.is_empty() {
                // Clearing the search bypasses the debounce
                self.debouncer.cancel();
                self.commit_search(String::new());
            } else {
                self.debouncer.submit(result.input);
            }
        }
        self.refresh_uidata();
    }

    // Esc in table mode clears the search text immediately.
    fn clear_search(&mut self) {
        if !self.query.raw_search.is_empty() || !self.query.committed_search.is_empty() {
            self.debouncer.cancel();
            self.query.raw_search = String::new();
            self.commit_search(String::new());
        }
    }

    fn commit_search(&mut self, text: String) {
        trace!("Committing search text \"{text}\"");
        if text != self.query.committed_search {
            self.query.committed_search = text;
            // A new result set starts over on the first page
            self.query.page = 1;
            self.cursor_row = 0;
        }
        self.recompute();
    }

    // -------------------- Sort & pagination ---------------------- //

    fn toggle_sort(&mut self) {
        let Some(field) = self.dataset.headers.get(self.cursor_column) else {
            return;
        };
        if self.query.sort_field.as_deref() == Some(field.id.as_str()) {
            self.query.sort_direction = self.query.sort_direction.toggled();
        } else {
            self.query.sort_field = Some(field.id.clone());
            self.query.sort_direction = SortDirection::Descending;
        }
        // Changing the sort keeps the current page, even if the page is now
        // beyond the end and renders empty
        self.recompute();
    }

    fn set_page(&mut self, page: usize) {
        let last = std::cmp::max(self.view.total_pages, 1);
        let page = page.clamp(1, last);
        if page != self.query.page {
            self.query.page = page;
            self.cursor_row = 0;
            self.recompute();
        }
    }

    fn move_cursor_row(&mut self, step: i64) {
        let nrows = self.view.page_rows.len();
        if nrows == 0 {
            return;
        }
        let row = self.cursor_row as i64 + step;
        self.cursor_row = row.clamp(0, nrows as i64 - 1) as usize;
        self.refresh_uidata();
    }

    fn move_cursor_column(&mut self, step: i64) {
        let ncols = self.dataset.headers.len();
        if ncols == 0 {
            return;
        }
        let column = self.cursor_column as i64 + step;
        self.cursor_column = column.clamp(0, ncols as i64 - 1) as usize;
        self.refresh_uidata();
    }

    // -------------------- Copy & popup ---------------------- //

    fn copy_cell(&mut self) {
        let Some(&row_idx) = self.view.page_rows.get(self.cursor_row) else {
            return;
        };
        let text = {
            let Some(field) = self.dataset.headers.get(self.cursor_column) else {
                return;
            };
            match copy_group_text(&self.dataset.data[row_idx], field) {
                Some(text) => text,
                None => {
                    trace!("Column {} declares no copy group", field.id);
                    return;
                }
            }
        };

        let copied = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text).is_ok(),
            None => false,
        };
        if copied {
            // The copy confirmation, a write failure stays silent
            self.set_status_message("Copied to clipboard".to_string());
        } else {
            trace!("Clipboard unavailable or write failed");
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn close_popup(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.uidata.show_popup = false;
        self.uidata.last_update = Instant::now();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
        self.uidata.last_update = Instant::now();
    }

    // -------------------- View recomputation ---------------------- //

    fn recompute(&mut self) {
        let start_time = Instant::now();
        self.view = engine::compute_view(&self.dataset, &self.query, self.config.page_size);
        trace!(
            "Recomputed view: {} matching, {} pages, took {}ms",
            self.view.total_matching,
            self.view.total_pages,
            start_time.elapsed().as_millis()
        );
        if self.cursor_row >= self.view.page_rows.len() {
            self.cursor_row = self.view.page_rows.len().saturating_sub(1);
        }
        self.refresh_uidata();
    }

    fn refresh_uidata(&mut self) {
        let headers: Vec<String> = self
            .dataset
            .headers
            .iter()
            .map(|h| {
                if h.label.is_empty() {
                    h.id.clone()
                } else {
                    h.label.clone()
                }
            })
            .collect();

        let rows: Vec<Vec<String>> = self
            .view
            .page_rows
            .iter()
            .map(|&ridx| {
                let record = &self.dataset.data[ridx];
                self.dataset
                    .headers
                    .iter()
                    .map(|field| match record.get(&field.id) {
                        None | Some(CellValue::Null) => String::new(),
                        Some(value) => match field.format {
                            Some(kind) => format::format(kind, value),
                            None => value.as_text(),
                        },
                    })
                    .collect()
            })
            .collect();

        // Column widths: widest cell on the page, at least the header label
        // plus the sort marker, capped at the configured maximum
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(cidx, label)| {
                let cell_max = rows.iter().map(|r| r[cidx].chars().count()).max().unwrap_or(0);
                std::cmp::min(
                    std::cmp::max(label.chars().count() + 2, cell_max),
                    self.config.max_column_width,
                )
            })
            .collect();

        let sort_column = self
            .query
            .sort_field
            .as_deref()
            .and_then(|id| self.dataset.headers.iter().position(|h| h.id == id));

        let active_search = matches!(self.modus, Modus::SEARCH);
        let search = if active_search {
            self.input.get()
        } else {
            InputResult {
                input: self.query.raw_search.clone(),
                ..InputResult::default()
            }
        };

        self.uidata = UIData {
            title: self.title.clone(),
            headers,
            widths,
            rows,
            total_matching: self.view.total_matching,
            total_pages: self.view.total_pages,
            page: self.query.page,
            sort_column,
            sort_direction: self.query.sort_direction,
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            search,
            active_search,
            show_popup: self.uidata.show_popup,
            popup_message: self.uidata.popup_message.clone(),
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
            last_update: Instant::now(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use ratatui::crossterm::event::KeyCode;

    fn small_dataset() -> Dataset {
        serde_json::from_str(
            r#"{
                "headers": [
                    {"id": "name", "label": "Name"},
                    {"id": "owner", "label": "Owner", "copyFields": ["owner", "name"]},
                    {"id": "size", "label": "Size", "format": "sizeFormat"}
                ],
                "data": [
                    {"name": "report.pdf", "owner": "alice", "size": 2048},
                    {"name": "notes.txt", "owner": "bob", "size": 512},
                    {"name": "archive.zip", "owner": "alice", "size": 9}
                ]
            }"#,
        )
        .unwrap()
    }

    fn big_dataset(n: usize) -> Dataset {
        let headers = serde_json::from_str(
            r#"[{"id": "idx", "label": "Idx"}, {"id": "grp", "label": "Group"}]"#,
        )
        .unwrap();
        let data: Vec<Record> = (0..n)
            .map(|i| {
                let grp = if i % 2 == 0 { "even" } else { "odd" };
                serde_json::from_str(&format!(r#"{{"idx": {i}, "grp": "{grp}"}}"#)).unwrap()
            })
            .collect();
        Dataset { headers, data }
    }

    fn model(dataset: Dataset) -> Model {
        Model::init(&JTConfig::default(), dataset, "test")
    }

    #[test]
    fn default_sort_is_last_field_descending() {
        let m = model(small_dataset());
        assert_eq!(m.query.sort_field.as_deref(), Some("size"));
        assert_eq!(m.query.sort_direction, SortDirection::Descending);
        // sizes 2048, 512, 9 descending
        assert_eq!(m.view.matching, vec![0, 1, 2]);
        assert_eq!(m.uidata.sort_column, Some(2));
    }

    #[test]
    fn formatted_cells_reach_the_ui() {
        let m = model(small_dataset());
        // first row is report.pdf with size 2048
        assert_eq!(m.uidata.rows[0], vec!["report.pdf", "alice", "2.00 KB"]);
        assert_eq!(m.uidata.total_matching, 3);
        assert_eq!(m.uidata.total_pages, 1);
    }

    #[test]
    fn committing_a_search_resets_to_the_first_page() {
        let mut m = model(big_dataset(250));
        m.update(Some(Message::NextPage)).unwrap();
        m.update(Some(Message::NextPage)).unwrap();
        assert_eq!(m.query.page, 3);

        m.commit_search("even".to_string());
        assert_eq!(m.query.page, 1);
        assert_eq!(m.view.total_matching, 125);
        assert_eq!(m.view.total_pages, 2);
    }

    #[test]
    fn changing_the_sort_keeps_the_page() {
        let mut m = model(big_dataset(250));
        m.update(Some(Message::NextPage)).unwrap();
        m.update(Some(Message::NextPage)).unwrap();
        assert_eq!(m.query.page, 3);

        m.update(Some(Message::ToggleSort)).unwrap();
        assert_eq!(m.query.page, 3);
        assert_eq!(m.query.sort_field.as_deref(), Some("idx"));
    }

    #[test]
    fn toggling_sort_twice_restores_direction_and_order() {
        let mut m = model(small_dataset());
        m.update(Some(Message::MoveRight)).unwrap();
        let before = m.view.matching.clone();
        let direction = m.query.sort_direction;

        m.update(Some(Message::ToggleSort)).unwrap();
        assert_eq!(m.query.sort_field.as_deref(), Some("owner"));
        m.update(Some(Message::ToggleSort)).unwrap();
        m.update(Some(Message::ToggleSort)).unwrap();
        // back on "owner" after three toggles: field switch, flip, flip back
        assert_eq!(m.query.sort_direction, SortDirection::Descending);

        // returning to the original field restores the original view
        m.update(Some(Message::MoveRight)).unwrap();
        m.update(Some(Message::ToggleSort)).unwrap();
        assert_eq!(m.query.sort_field.as_deref(), Some("size"));
        assert_eq!(m.query.sort_direction, SortDirection::Descending);
        assert_eq!(m.view.matching, before);
        assert_eq!(m.query.sort_direction, direction);
    }

    #[test]
    fn page_navigation_clamps() {
        let mut m = model(big_dataset(250));
        m.update(Some(Message::PrevPage)).unwrap();
        assert_eq!(m.query.page, 1);
        m.update(Some(Message::LastPage)).unwrap();
        assert_eq!(m.query.page, 3);
        m.update(Some(Message::NextPage)).unwrap();
        assert_eq!(m.query.page, 3);
        m.update(Some(Message::FirstPage)).unwrap();
        assert_eq!(m.query.page, 1);
    }

    #[test]
    fn typing_updates_the_echo_but_not_the_committed_text() {
        let mut m = model(small_dataset());
        m.update(Some(Message::Search)).unwrap();
        assert!(m.raw_keyevents());
        m.update(Some(Message::RawKey(KeyCode::Char('b').into())))
            .unwrap();
        m.update(Some(Message::RawKey(KeyCode::Char('o').into())))
            .unwrap();
        assert_eq!(m.query.raw_search, "bo");
        assert_eq!(m.query.committed_search, "");
        assert!(m.debouncer.is_pending());
        // nothing filtered yet
        assert_eq!(m.view.total_matching, 3);
    }

    #[test]
    fn clearing_the_search_bypasses_the_debounce() {
        let mut m = model(small_dataset());
        m.commit_search("bob".to_string());
        assert_eq!(m.view.total_matching, 1);

        m.update(Some(Message::Search)).unwrap();
        m.query.raw_search = "bob".to_string();
        m.input.set("b");
        m.update(Some(Message::RawKey(KeyCode::Backspace.into())))
            .unwrap();
        assert_eq!(m.query.committed_search, "");
        assert!(!m.debouncer.is_pending());
        assert_eq!(m.view.total_matching, 3);
    }

    #[test]
    fn escape_in_table_mode_clears_the_search() {
        let mut m = model(small_dataset());
        m.commit_search("bob".to_string());
        m.query.raw_search = "bob".to_string();
        assert_eq!(m.view.total_matching, 1);

        m.update(Some(Message::Exit)).unwrap();
        assert_eq!(m.query.raw_search, "");
        assert_eq!(m.query.committed_search, "");
        assert_eq!(m.view.total_matching, 3);
    }

    #[test]
    fn escape_in_search_mode_reverts_the_echo() {
        let mut m = model(small_dataset());
        m.commit_search("alice".to_string());
        m.query.raw_search = "alice".to_string();

        m.update(Some(Message::Search)).unwrap();
        m.update(Some(Message::RawKey(KeyCode::Char('x').into())))
            .unwrap();
        assert_eq!(m.query.raw_search, "alicex");
        m.update(Some(Message::RawKey(KeyCode::Esc.into()))).unwrap();
        assert_eq!(m.query.raw_search, "alice");
        assert!(!m.raw_keyevents());
        assert!(!m.debouncer.is_pending());
    }

    #[test]
    fn empty_dataset_renders_an_empty_state() {
        let m = model(Dataset::empty());
        assert_eq!(m.uidata.total_matching, 0);
        assert_eq!(m.uidata.total_pages, 0);
        assert!(m.uidata.rows.is_empty());
        assert_eq!(m.uidata.status_message, "No data loaded");
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut m = model(small_dataset());
        m.update(Some(Message::Help)).unwrap();
        assert!(m.uidata.show_popup);
        // table keys are ignored while the popup is up
        m.update(Some(Message::NextPage)).unwrap();
        assert_eq!(m.query.page, 1);
        m.update(Some(Message::Exit)).unwrap();
        assert!(!m.uidata.show_popup);
    }
}
