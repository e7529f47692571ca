//! String-mode result sets for the read surface.
//!
//! Replication peers exchange SQL text and hex hashes, so the facade's read
//! path deliberately returns every cell as text: NULL becomes the empty
//! string, numbers are rendered in their canonical decimal form, and blobs
//! are passed through lossily. Callers that need typed access should query
//! the engine directly.

/// Result of a read-only query: column headers plus rows of text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl QueryResult {
    /// Assemble a result set. `rows` are expected to be rectangular with
    /// `headers.len()` cells each.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Column names, in select order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the query produced no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell at (`row`, `column`), if present.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Vec<String>;
    type IntoIter = std::slice::Iter<'a, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
