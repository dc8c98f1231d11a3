//! Per-image class count table.
//!
//! [`RowAccumulator`] collects one sparse row per image while a run is in
//! progress; [`RowAccumulator::finish`] turns it into a dense [`ResultsTable`]
//! in which every class seen anywhere in the run is a column and absent
//! counts are zero.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{PlcError, Result};
use crate::models::ClassCountMap;

pub const DEFAULT_DELIMITER: char = ',';

/// Rows collected during a run, in insertion order
#[derive(Debug, Default)]
pub struct RowAccumulator {
    rows: Vec<(String, ClassCountMap)>,
    seen: HashSet<String>,
    columns: BTreeSet<String>,
}

impl RowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the counts for one image. Image names must be unique within a table.
    pub fn push(&mut self, image: impl Into<String>, counts: ClassCountMap) -> Result<()> {
        let image = image.into();
        if !self.seen.insert(image.clone()) {
            return Err(PlcError::DuplicateRow(image));
        }

        self.columns.extend(counts.keys().cloned());
        self.rows.push((image, counts));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Class names seen so far, sorted
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Fill the gaps with zero and freeze the column set
    pub fn finish(self) -> ResultsTable {
        let columns: Vec<String> = self.columns.into_iter().collect();
        let rows = self
            .rows
            .into_iter()
            .map(|(image, counts)| TableRow {
                counts: columns
                    .iter()
                    .map(|class| counts.get(class).copied().unwrap_or(0))
                    .collect(),
                image,
            })
            .collect();

        ResultsTable { columns, rows }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub image: String,
    /// One count per table column, in column order
    pub counts: Vec<u32>,
}

/// Finalized table: one row per image, one column per class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl ResultsTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, image: &str) -> Option<&TableRow> {
        self.rows.iter().find(|row| row.image == image)
    }

    /// Count of `class` in `image`; zero for a class that is not a column,
    /// `None` when there is no row for the image.
    pub fn count(&self, image: &str, class: &str) -> Option<u32> {
        let row = self.row(image)?;
        Some(
            self.columns
                .iter()
                .position(|c| c == class)
                .map_or(0, |idx| row.counts[idx]),
        )
    }

    /// Image name to full (zero-filled) class counts
    pub fn to_map(&self) -> BTreeMap<String, ClassCountMap> {
        self.rows
            .iter()
            .map(|row| {
                let counts: ClassCountMap = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.counts.iter().copied())
                    .collect();
                (row.image.clone(), counts)
            })
            .collect()
    }

    /// Render as delimited text: a header of class names (first cell empty),
    /// then one line per image starting with the image name.
    pub fn to_delimited_string(&self, delimiter: char) -> String {
        let mut out = String::new();

        let header: Vec<String> = std::iter::once(String::new())
            .chain(self.columns.iter().map(|c| quote_field(c, delimiter)))
            .collect();
        out.push_str(&header.join(&delimiter.to_string()));
        out.push('\n');

        for row in &self.rows {
            let fields: Vec<String> = std::iter::once(quote_field(&row.image, delimiter))
                .chain(row.counts.iter().map(u32::to_string))
                .collect();
            out.push_str(&fields.join(&delimiter.to_string()));
            out.push('\n');
        }

        out
    }

    pub fn write_delimited(&self, path: &Path, delimiter: char) -> Result<()> {
        let file = File::create(path).map_err(|e| PlcError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(self.to_delimited_string(delimiter).as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| PlcError::io(path, e))
    }

    pub fn read_delimited(path: &Path, delimiter: char) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PlcError::io(path, e))?;
        Self::from_delimited_str(&text, delimiter).map_err(|(line, reason)| PlcError::Table {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    /// Parse text produced by [`ResultsTable::to_delimited_string`].
    /// Errors carry the 1-based line the problem was found on.
    pub fn from_delimited_str(
        text: &str,
        delimiter: char,
    ) -> std::result::Result<Self, (usize, String)> {
        let mut records = split_records(text, delimiter)?.into_iter();
        let (_, header) = records
            .next()
            .ok_or_else(|| (1, "missing header line".to_string()))?;
        let columns: Vec<String> = header.into_iter().skip(1).collect();

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for (line, fields) in records {
            if fields.len() != columns.len() + 1 {
                return Err((
                    line,
                    format!("expected {} fields, found {}", columns.len() + 1, fields.len()),
                ));
            }

            let mut fields = fields.into_iter();
            let image = fields.next().unwrap_or_default();
            if !seen.insert(image.clone()) {
                return Err((line, format!("duplicate row for image '{}'", image)));
            }

            let counts = fields
                .map(|f| {
                    f.trim()
                        .parse::<u32>()
                        .map_err(|_| (line, format!("'{}' is not a count", f)))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.push(TableRow { image, counts });
        }

        Ok(Self { columns, rows })
    }
}

fn quote_field(field: &str, delimiter: char) -> String {
    if field.contains([delimiter, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split delimited text into records, honouring double-quoted fields.
/// Each record is paired with the line it starts on.
fn split_records(
    text: &str,
    delimiter: char,
) -> std::result::Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut started = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                started = true;
            }
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut record)));
                started = false;
                line += 1;
                record_line = line;
            }
            c if c == delimiter => {
                record.push(std::mem::take(&mut field));
                started = true;
            }
            _ => {
                field.push(c);
                started = true;
            }
        }
    }

    if in_quotes {
        return Err((record_line, "unterminated quoted field".to_string()));
    }
    if started {
        record.push(field);
        records.push((record_line, record));
    }

    Ok(records)
}
