use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Stylize,
    text::Line,
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Widget},
};

use crate::domain::JTConfig;
use crate::engine::SortDirection;
use crate::model::UIData;

pub const TOPBAR_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;

// How long a transient status message (e.g. the copy confirmation) stays
// visible.
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct TableUI {
    _config: JTConfig,
}

impl TableUI {
    pub fn new(config: &JTConfig) -> Self {
        Self {
            _config: config.clone(),
        }
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let [topbar, table, statusline] = Layout::vertical([
            Constraint::Length(TOPBAR_HEIGHT as u16),
            Constraint::Min(TABLE_HEADER_HEIGHT as u16),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.draw_topbar(uidata, frame, topbar);
        if uidata.rows.is_empty() {
            let empty = Paragraph::new("No matching records").centered().dim();
            frame.render_widget(empty, table);
        } else {
            self.draw_table(uidata, frame, table);
        }
        self.draw_statusline(uidata, frame, statusline);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_topbar(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let pages = std::cmp::max(uidata.total_pages, 1);
        let left = format!(
            "{}: {} rows, page {}/{}",
            uidata.title, uidata.total_matching, uidata.page, pages
        );
        let search = format!("search: {}", uidata.search.input);

        let [left_area, right_area] = Layout::horizontal([
            Constraint::Min(10),
            Constraint::Length(search.chars().count() as u16 + 1),
        ])
        .areas(area);

        frame.render_widget(Line::from(left).bold(), left_area);
        if uidata.active_search {
            frame.render_widget(Line::from(search).reversed(), right_area);
            // Place the terminal cursor inside the search text
            let offset = "search: ".len() + uidata.search.cursor_pos;
            frame.set_cursor_position((right_area.x + offset as u16, right_area.y));
        } else {
            frame.render_widget(Line::from(search), right_area);
        }
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(uidata.headers.iter().enumerate().map(|(cidx, label)| {
            let marker = match uidata.sort_column {
                Some(sort_col) if sort_col == cidx => match uidata.sort_direction {
                    SortDirection::Ascending => " ↑",
                    SortDirection::Descending => " ↓",
                },
                _ => "",
            };
            Cell::from(format!("{label}{marker}")).bold()
        }));

        let rows = uidata.rows.iter().enumerate().map(|(ridx, row)| {
            Row::new(row.iter().enumerate().map(|(cidx, text)| {
                let cell = Cell::from(text.as_str());
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    cell.reversed()
                } else {
                    cell
                }
            }))
        });

        let widths = uidata
            .widths
            .iter()
            .map(|&w| Constraint::Length(w as u16));

        let table = Table::new(rows, widths).header(header).column_spacing(1);
        frame.render_widget(table, area);
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let line = if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT
            && !uidata.status_message.is_empty()
        {
            Line::from(uidata.status_message.as_str()).italic()
        } else {
            Line::from("q: quit   /: search   s: sort   ?: help").dim()
        };
        frame.render_widget(line, area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = centered_rect(frame.area(), 60, 80);
        Clear.render(area, frame.buffer_mut());
        let popup = Paragraph::new(uidata.popup_message.as_str())
            .block(Block::bordered().title(" help "));
        frame.render_widget(popup, area);
    }
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
