//! Placeholder resolution: header row + data row → replacement map.

use crate::error::{Error, Result};
use crate::types::DataRow;
use serde::Serialize;

/// Placeholder token → replacement text, in header column order.
///
/// Built fresh for every row. Iteration order is the order in which each
/// token first appeared in the header row; a repeated token keeps that
/// position but takes the value of its last column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplacementMap {
    entries: Vec<(String, String)>,
}

impl ReplacementMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token, overwriting the value of an existing one in place.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    /// Look up the replacement for a token.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate `(token, value)` pairs in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Tokens in evaluation order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReplacementMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = ReplacementMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Build the replacement map for one data row.
///
/// The row must have exactly one value per header; anything else is a
/// [`Error::RowShapeMismatch`]. A value without a text form fails the row
/// with [`Error::ValueCoercion`].
pub fn resolve(headers: &[String], row: &DataRow) -> Result<ReplacementMap> {
    if headers.len() != row.values.len() {
        return Err(Error::RowShapeMismatch {
            row: row.number,
            expected: headers.len(),
            found: row.values.len(),
        });
    }

    let mut map = ReplacementMap::new();
    for (header, value) in headers.iter().zip(&row.values) {
        let text = value.to_text().map_err(|reason| Error::ValueCoercion {
            row: row.number,
            column: header.clone(),
            reason,
        })?;
        map.insert(header.as_str(), text);
    }

    log::trace!("Row {}: {} placeholder(s) resolved", row.number, map.len());
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_example_row() {
        let row = DataRow::new(2, vec!["Alice".into(), 42i64.into()]);
        let map = resolve(&headers(&["name", "amount"]), &row).unwrap();

        assert_eq!(map.get("name"), Some("Alice"));
        assert_eq!(map.get("amount"), Some("42"));
        assert_eq!(map.tokens().collect::<Vec<_>>(), vec!["name", "amount"]);
    }

    #[test]
    fn test_key_set_matches_headers() {
        let hs = headers(&["a", "b", "c"]);
        let row = DataRow::new(
            7,
            vec![CellValue::Bool(false), CellValue::Number(1.25), CellValue::Empty],
        );
        let map = resolve(&hs, &row).unwrap();

        assert_eq!(map.len(), hs.len());
        for (i, h) in hs.iter().enumerate() {
            assert_eq!(map.get(h).unwrap(), row.values[i].to_text().unwrap());
        }
    }

    #[test]
    fn test_duplicate_header_last_write_wins() {
        let row = DataRow::new(2, vec!["first".into(), "other".into(), "second".into()]);
        let map = resolve(&headers(&["dup", "x", "dup"]), &row).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("dup"), Some("second"));
        // keeps the position of its first column
        assert_eq!(map.tokens().collect::<Vec<_>>(), vec!["dup", "x"]);
    }

    #[test]
    fn test_short_row_is_shape_mismatch() {
        let row = DataRow::new(4, vec!["only".into()]);
        let err = resolve(&headers(&["a", "b"]), &row).unwrap_err();
        assert!(matches!(
            err,
            Error::RowShapeMismatch {
                row: 4,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_long_row_is_shape_mismatch() {
        let row = DataRow::new(2, vec!["a".into(), "b".into(), "c".into()]);
        assert!(resolve(&headers(&["a", "b"]), &row).is_err());
    }

    #[test]
    fn test_error_cell_fails_row() {
        let row = DataRow::new(
            9,
            vec!["ok".into(), CellValue::Error("#DIV/0!".to_string())],
        );
        let err = resolve(&headers(&["a", "total"]), &row).unwrap_err();
        match err {
            Error::ValueCoercion { row, column, .. } => {
                assert_eq!(row, 9);
                assert_eq!(column, "total");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
