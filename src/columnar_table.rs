use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MalformedError;

/// A table in the Gecko profile's "schema + data" encoding.
///
/// `schema` maps a column name to the position of that column in every row,
/// and `data` holds the rows:
///
/// ```json
/// { "schema": { "name": 0, "time": 1, "data": 2 }, "data": [[3, 12.5, null]] }
/// ```
///
/// Which columns exist depends on the format version. These helpers only
/// read and write cells; they don't know anything about versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnarTable {
    pub schema: IndexMap<String, usize>,
    pub data: Vec<Vec<Value>>,
}

impl ColumnarTable {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.get(name).copied()
    }

    pub fn required_column_index(&self, name: &str) -> Result<usize, MalformedError> {
        self.column_index(name)
            .ok_or_else(|| MalformedError::MissingColumn(name.to_string()))
    }

    pub fn get_cell(&self, row_index: usize, name: &str) -> Result<&Value, MalformedError> {
        let column = self.required_column_index(name)?;
        let row = self.row(row_index)?;
        row.get(column).ok_or(MalformedError::IndexOutOfRange {
            index: column,
            len: row.len(),
        })
    }

    pub fn cell_mut(&mut self, row_index: usize, name: &str) -> Result<&mut Value, MalformedError> {
        let column = self.required_column_index(name)?;
        let row = self.row_mut(row_index)?;
        let len = row.len();
        row.get_mut(column)
            .ok_or(MalformedError::IndexOutOfRange { index: column, len })
    }

    /// Writes a cell, padding the row with nulls if it is shorter than the
    /// schema requires.
    pub fn set_cell(
        &mut self,
        row_index: usize,
        name: &str,
        value: Value,
    ) -> Result<(), MalformedError> {
        let column = self.required_column_index(name)?;
        let row = self.row_mut(row_index)?;
        if row.len() <= column {
            row.resize(column + 1, Value::Null);
        }
        row[column] = value;
        Ok(())
    }

    /// Removes `name` from the schema and returns its old position. The rows
    /// are left alone; callers that need shorter rows use [`truncate_rows`].
    ///
    /// [`truncate_rows`]: ColumnarTable::truncate_rows
    pub fn drop_column(&mut self, name: &str) -> Option<usize> {
        self.schema.shift_remove(name)
    }

    pub fn truncate_rows(&mut self, max_len: usize) {
        for row in &mut self.data {
            row.truncate(max_len);
        }
    }

    fn row(&self, row_index: usize) -> Result<&Vec<Value>, MalformedError> {
        let len = self.data.len();
        self.data.get(row_index).ok_or(MalformedError::IndexOutOfRange {
            index: row_index,
            len,
        })
    }

    fn row_mut(&mut self, row_index: usize) -> Result<&mut Vec<Value>, MalformedError> {
        let len = self.data.len();
        self.data
            .get_mut(row_index)
            .ok_or(MalformedError::IndexOutOfRange {
                index: row_index,
                len,
            })
    }
}
