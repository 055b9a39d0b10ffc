//! mmCIF raw dict.
//!
//! A [`CifDict`] is one data block reduced to its categories. Every category
//! is a table: ordered field names plus row-major values. A key/value
//! category (`_entry.id 1LOL`) is simply a table with one row.

use crate::error::ParseWarning;

/// The decoded first data block of an mmCIF file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CifDict {
    /// Block name, without the `data_` prefix.
    pub name: String,
    /// Categories in declaration order.
    pub categories: Vec<Category>,
    /// Recoverable problems met while parsing.
    pub warnings: Vec<ParseWarning>,
}

/// One category table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    /// Category name without the leading underscore, e.g. `atom_site`.
    pub name: String,
    /// Field names, e.g. `Cartn_x`.
    pub fields: Vec<String>,
    /// Row-major flat array of values. Length = `fields.len() * nrows()`.
    pub values: Vec<Value>,
}

/// An mmCIF data value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string value (unquoted, single-quoted, double-quoted, or semicolon text).
    Str(String),
    /// The inapplicable marker `.`.
    Inapplicable,
    /// The unknown marker `?`.
    Unknown,
}

impl Value {
    /// Returns the string content, or `None` for `.` / `?`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Tries to parse the value as `f64`.
    ///
    /// Handles uncertainty notation like `50.123(4)` by stripping the
    /// parenthesized uncertainty before parsing.
    pub fn as_f64(&self) -> Option<f64> {
        let s = self.as_str()?.trim();
        let s = match s.find('(') {
            Some(idx) => &s[..idx],
            None => s,
        };
        s.parse().ok()
    }

    /// Tries to parse the value as `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_str()?.trim().parse().ok()
    }
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Number of rows in this category.
    pub fn nrows(&self) -> usize {
        if self.fields.is_empty() {
            0
        } else {
            self.values.len() / self.fields.len()
        }
    }

    /// Find the column index for a field (case-insensitive).
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.eq_ignore_ascii_case(field))
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.nrows()).then_some(Row {
            category: self,
            index,
        })
    }

    pub fn rows(&self) -> RowIter<'_> {
        RowIter {
            category: self,
            row: 0,
        }
    }

    /// Iterate over a single column's values.
    pub fn column(&self, field: &str) -> Option<ColumnIter<'_>> {
        let col_idx = self.field_index(field)?;
        Some(ColumnIter {
            category: self,
            col_idx,
            row: 0,
        })
    }
}

impl CifDict {
    /// Look up a category by name (case-insensitive, leading `_` optional).
    pub fn category(&self, name: &str) -> Option<&Category> {
        let name = name.strip_prefix('_').unwrap_or(name);
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The value of `field` in the first row of `category`.
    pub fn value(&self, category: &str, field: &str) -> Option<&Value> {
        self.category(category)?.row(0)?.get(field)
    }

    /// Add a category; a later declaration with the same name replaces the
    /// earlier one and records a warning.
    pub fn declare(&mut self, category: Category) {
        if let Some(idx) = self
            .categories
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(&category.name))
        {
            self.categories.remove(idx);
            self.warnings
                .push(ParseWarning::DuplicateCategory(category.name.clone()));
        }
        self.categories.push(category);
    }
}

/// A view of one row of a category.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    category: &'a Category,
    index: usize,
}

impl<'a> Row<'a> {
    /// The value of a field in this row (case-insensitive).
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        let col = self.category.field_index(field)?;
        self.category
            .values
            .get(self.index * self.category.fields.len() + col)
    }

    /// The string content of a field, `None` when absent, `.` or `?`.
    pub fn str(&self, field: &str) -> Option<&'a str> {
        self.get(field)?.as_str()
    }

    pub fn f64(&self, field: &str) -> Option<f64> {
        self.get(field)?.as_f64()
    }
}

/// Iterator over the rows of a category.
pub struct RowIter<'a> {
    category: &'a Category,
    row: usize,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.category.row(self.row)?;
        self.row += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.category.nrows() - self.row;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowIter<'_> {}

/// Iterator over a single column's values.
pub struct ColumnIter<'a> {
    category: &'a Category,
    col_idx: usize,
    row: usize,
}

impl<'a> Iterator for ColumnIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.category.nrows() {
            return None;
        }
        let stride = self.category.fields.len();
        let idx = self.row * stride + self.col_idx;
        self.row += 1;
        Some(&self.category.values[idx])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.category.nrows() - self.row;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ColumnIter<'_> {}
