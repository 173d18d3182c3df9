//! Tabular structures on both sides of the graph: the canonical long-format
//! table handed in by a source pipeline and the materialized table handed on
//! to the merge step.

use crate::datatype::{Cell, DataType, Value};
use crate::error::{BarometerError, Result};
use crate::schema::{Kind, Schema};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl CanonicalTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }
    /// Appends a row; its width must match the header.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(BarometerError::Schema {
                message: format!(
                    "row {} has {} cells but the table has {} columns",
                    self.rows.len(),
                    row.len(),
                    self.columns.len()
                ),
                missing: Vec::new(),
            });
        }
        self.rows.push(row);
        Ok(())
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let position = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[position])
    }
    /// The rows as the materializer would type them, in the schema's output
    /// order. Dates are read the same way, so unreadable dates fail here too.
    pub fn expected_cells(&self, schema: &Schema) -> Result<Vec<Vec<Cell>>> {
        let mut positions = Vec::with_capacity(schema.arity());
        let mut missing = Vec::new();
        for spec in schema.attributes() {
            match self.column_index(spec.column()) {
                Some(position) => positions.push(position),
                None => missing.push(spec.column().to_owned()),
            }
        }
        if !missing.is_empty() {
            return Err(BarometerError::missing_columns(missing));
        }
        let mut expected = Vec::with_capacity(self.rows.len());
        for (r, row) in self.rows.iter().enumerate() {
            let mut cells = Vec::with_capacity(positions.len());
            for (spec, position) in schema.attributes().iter().zip(&positions) {
                let cell = match (row[*position].lexical(), spec.kind()) {
                    (None, _) => Cell::Missing,
                    (Some(lexical), Kind::Text) => Cell::Text(lexical.into_owned()),
                    (Some(lexical), Kind::Date) => match NaiveDate::coerce(&lexical) {
                        Some(date) => Cell::Date(date),
                        None => {
                            return Err(BarometerError::TypeCoercion {
                                row: r,
                                attribute: spec.output().to_owned(),
                                value: lexical.into_owned(),
                                expected: spec.kind().data_type(),
                            });
                        }
                    },
                };
                cells.push(cell);
            }
            expected.push(cells);
        }
        Ok(expected)
    }
    pub fn fingerprint(&self, schema: &Schema) -> Result<blake3::Hash> {
        Ok(fingerprint_rows(self.expected_cells(schema)?.iter()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl MaterializedTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }
    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let position = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[position])
    }
    pub fn fingerprint(&self) -> blake3::Hash {
        fingerprint_rows(self.rows.iter())
    }
}

// Row digests are sorted before the final hash, so the fingerprint identifies
// the multiset of rows and not their order.
fn fingerprint_rows<'a>(rows: impl Iterator<Item = &'a Vec<Cell>>) -> blake3::Hash {
    let mut digests: Vec<[u8; 32]> = rows.map(|row| *digest_row(row).as_bytes()).collect();
    digests.sort_unstable();
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(digests.len() as u64).to_le_bytes());
    for digest in &digests {
        hasher.update(digest);
    }
    hasher.finalize()
}

fn digest_row(row: &[Cell]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for cell in row {
        match cell {
            Cell::Missing => {
                hasher.update(&[0]);
            }
            Cell::Text(s) => {
                hasher.update(&[1]);
                hasher.update(&(s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
            Cell::Date(d) => {
                hasher.update(&[2]);
                hasher.update(d.format("%Y-%m-%d").to_string().as_bytes());
            }
        }
    }
    hasher.finalize()
}
