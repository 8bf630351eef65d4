use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::domain::JTError;
use crate::format::FormatKind;

// A single raw cell as it appears in the json data file. An absent key in a
// record and an explicit null are both treated as a missing value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl CellValue {
    // String representation used for searching and for unformatted display.
    // Integral numbers print without a decimal point, missing values as "".
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            CellValue::Bool(b) => b.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Null => String::new(),
        }
    }

    // Numeric view of the cell. Text cells parse, everything else but
    // numbers is None.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Bool(_) | CellValue::Null => None,
        }
    }
}

pub type Record = HashMap<String, CellValue>;

// One displayable/searchable column, as declared in the data file header
// list. The serde names match the json keys of the data format.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub format: Option<FormatKind>,
    #[serde(rename = "copyFields", default)]
    pub copy_fields: Option<Vec<String>>,
}

// The full schema + record collection. Loaded once at startup and read-only
// for the rest of the session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    pub headers: Vec<FieldDescriptor>,
    pub data: Vec<Record>,
}

impl Dataset {
    pub fn empty() -> Self {
        Dataset::default()
    }

    pub fn load(path: &Path) -> Result<Dataset, JTError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => JTError::FileNotFound,
            ErrorKind::PermissionDenied => JTError::PermissionDenied,
            _ => JTError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(JTError::LoadingFailed("Not a file!".into()));
        }

        let raw = fs::read_to_string(path)?;
        let dataset: Dataset = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} records with {} fields from {}",
            dataset.data.len(),
            dataset.headers.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.headers.iter().find(|h| h.id == id)
    }
}

// Concatenation of the field's copy group values, joined by a backslash.
// None if the field declares no copy group. Missing member values
// contribute empty strings.
pub fn copy_group_text(record: &Record, field: &FieldDescriptor) -> Option<String> {
    let fields = field.copy_fields.as_ref()?;
    let parts: Vec<String> = fields
        .iter()
        .map(|id| record.get(id).map(|v| v.as_text()).unwrap_or_default())
        .collect();
    Some(parts.join("\\"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cell_values_deserialize_untagged() {
        let record: Record =
            serde_json::from_str(r#"{"a": 1.5, "b": "x", "c": true, "d": null}"#).unwrap();
        assert_eq!(record["a"], CellValue::Number(1.5));
        assert_eq!(record["b"], CellValue::Text("x".to_string()));
        assert_eq!(record["c"], CellValue::Bool(true));
        assert_eq!(record["d"], CellValue::Null);
        assert!(record.get("e").is_none());
    }

    #[test]
    fn integral_numbers_print_without_decimals() {
        assert_eq!(CellValue::Number(2048.0).as_text(), "2048");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
        assert_eq!(CellValue::Null.as_text(), "");
    }

    #[test]
    fn text_cells_parse_as_numbers() {
        assert_eq!(CellValue::Text("10".to_string()).as_f64(), Some(10.0));
        assert_eq!(CellValue::Text("ten".to_string()).as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
        assert_eq!(CellValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn unknown_format_tag_is_rejected() {
        let result: Result<FieldDescriptor, _> =
            serde_json::from_str(r#"{"id": "x", "label": "X", "format": "hexFormat"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn copy_group_joins_with_backslash() {
        let record: Record =
            serde_json::from_str(r#"{"host": "srv01", "path": "share", "size": 42}"#).unwrap();
        let field: FieldDescriptor = serde_json::from_str(
            r#"{"id": "path", "label": "Path", "copyFields": ["host", "path", "missing"]}"#,
        )
        .unwrap();
        assert_eq!(
            copy_group_text(&record, &field),
            Some("srv01\\share\\".to_string())
        );

        let plain: FieldDescriptor =
            serde_json::from_str(r#"{"id": "size", "label": "Size"}"#).unwrap();
        assert_eq!(copy_group_text(&record, &plain), None);
    }

    #[test]
    fn load_fixture() {
        let dataset = Dataset::load(Path::new("tests/fixtures/testdata_01.json")).unwrap();
        assert_eq!(dataset.headers.len(), 4);
        assert_eq!(dataset.headers[0].id, "name");
        assert_eq!(dataset.headers[2].format, Some(FormatKind::Size));
        assert_eq!(dataset.headers[3].format, Some(FormatKind::Date));
        assert!(dataset.data.len() > 0);
        assert!(dataset.field("size").is_some());
        assert!(dataset.field("bogus").is_none());
    }

    #[test]
    fn load_missing_file() {
        let result = Dataset::load(Path::new("tests/fixtures/no_such_file.json"));
        assert!(matches!(result, Err(JTError::FileNotFound)));
    }

    #[test]
    fn load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not json").unwrap();
        let result = Dataset::load(file.path());
        assert!(matches!(result, Err(JTError::JsonError(_))));
    }
}
