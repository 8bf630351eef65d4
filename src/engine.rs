use std::cmp::Ordering;

use rayon::prelude::*;

use crate::dataset::{CellValue, Dataset, FieldDescriptor, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

// The user controlled inputs the view is derived from. committed_search lags
// raw_search by the debounce window.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub raw_search: String,
    pub committed_search: String,
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    // 1-indexed page
    pub page: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        QueryState {
            raw_search: String::new(),
            committed_search: String::new(),
            sort_field: None,
            sort_direction: SortDirection::Descending,
            page: 1,
        }
    }
}

// Derived result for one QueryState. Row indices point into Dataset::data.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub matching: Vec<usize>,
    pub page_rows: Vec<usize>,
    pub total_matching: usize,
    pub total_pages: usize,
}

// Indices of the records where any declared field contains the query,
// case-insensitive. The empty query matches everything. Order preserving.
pub fn filter(records: &[Record], schema: &[FieldDescriptor], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..records.len()).collect();
    }
    let needle = query.to_lowercase();
    records
        .par_iter()
        .enumerate()
        .filter(|(_, record)| {
            schema.iter().any(|field| {
                record
                    .get(&field.id)
                    .map(|v| v.as_text())
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
            })
        })
        .map(|(idx, _)| idx)
        .collect()
}

// Stable sort of the given row order by one field. No field, or a field id
// that appears in no record, leaves the order untouched.
pub fn sort(
    records: &[Record],
    mut rows: Vec<usize>,
    field_id: Option<&str>,
    direction: SortDirection,
) -> Vec<usize> {
    let Some(field_id) = field_id else {
        return rows;
    };
    rows.sort_by(|&a, &b| {
        compare_cells(records[a].get(field_id), records[b].get(field_id), direction)
    });
    rows
}

// Pairwise comparison rule: when both values read as numbers compare
// numerically, otherwise compare the string representations. Missing values
// (absent key or null) order last regardless of direction.
fn compare_cells(
    a: Option<&CellValue>,
    b: Option<&CellValue>,
    direction: SortDirection,
) -> Ordering {
    let a = a.filter(|v| !matches!(v, CellValue::Null));
    let b = b.filter(|v| !matches!(v, CellValue::Null));
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    let ordering = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.as_text().cmp(&b.as_text()),
    };

    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

// 1-indexed page slice, clipped to the available rows. Pages beyond the end
// are empty, not an error.
pub fn paginate(rows: &[usize], page_size: usize, page: usize) -> &[usize] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let begin = (page - 1).saturating_mul(page_size);
    if begin >= rows.len() {
        return &[];
    }
    let end = std::cmp::min(begin + page_size, rows.len());
    &rows[begin..end]
}

pub fn total_pages(nrows: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    nrows.div_ceil(page_size)
}

// The fixed pipeline: filter with the committed search text, sort, then
// slice out the requested page.
pub fn compute_view(dataset: &Dataset, state: &QueryState, page_size: usize) -> View {
    let matching = filter(&dataset.data, &dataset.headers, &state.committed_search);
    let matching = sort(
        &dataset.data,
        matching,
        state.sort_field.as_deref(),
        state.sort_direction,
    );
    let page_rows = paginate(&matching, page_size, state.page).to_vec();
    let total_matching = matching.len();
    View {
        page_rows,
        total_matching,
        total_pages: total_pages(total_matching, page_size),
        matching,
    }
}
