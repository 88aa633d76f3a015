//! Reading and writing STAR tables, the text format RELION, crYOLO and
//! pyem use to exchange per-particle and per-micrograph metadata.
//!
//! A file is a sequence of `data_<name>` blocks. Each block may carry
//! single `_label value` pairs and at most one `loop_` table whose
//! column labels are listed as `_label #n` lines, followed by
//! whitespace-separated rows.

use crate::common_io::{open_buf_writer, read_to_string};
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StarSyntaxError {
    #[error("line {line}: `{text}` appears outside of a data block")]
    OutsideBlock { line: usize, text: Box<str> },

    #[error("line {line}: block `data_{block}` has more than one loop")]
    DuplicateLoop { line: usize, block: Box<str> },

    #[error("line {line}: expected {expected} values, found {found}")]
    RowWidth {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: loop row before any column label")]
    RowWithoutLabels { line: usize },

    #[error("line {line}: label `{label}` has no value")]
    MissingValue { line: usize, label: Box<str> },

    #[error("line {line}: unterminated quote")]
    UnterminatedQuote { line: usize },

    #[error("row has {found} values, table has {expected} columns")]
    TableWidth { expected: usize, found: usize },
}

/// Strip the leading underscore and the RELION `rln` prefix so that
/// `_rlnCoordinateX`, `rlnCoordinateX` and `CoordinateX` compare equal.
pub fn normalize_label(label: &str) -> &str {
    let label = label.trim_start_matches('_');
    label.strip_prefix("rln").unwrap_or(label)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarTable {
    labels: Vec<Box<str>>,
    rows: Vec<Vec<Box<str>>>,
}

impl StarTable {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|x| x.as_ref().trim_start_matches('_').into())
                .collect(),
            rows: vec![],
        }
    }

    pub fn labels(&self) -> &[Box<str>] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<Box<str>>] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.labels.len()
    }

    pub fn push_row(&mut self, row: Vec<Box<str>>) -> Result<(), StarSyntaxError> {
        if row.len() != self.labels.len() {
            return Err(StarSyntaxError::TableWidth {
                expected: self.labels.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Find a column by label, ignoring `_` and `rln` prefixes
    pub fn column_index(&self, label: &str) -> Option<usize> {
        let label = normalize_label(label);
        self.labels
            .iter()
            .position(|x| normalize_label(x) == label)
    }

    pub fn column(&self, label: &str) -> Option<Vec<&str>> {
        let j = self.column_index(label)?;
        Some(self.rows.iter().map(|row| row[j].as_ref()).collect())
    }

    /// Parse every value of a column; `None` if there is no such column.
    /// A parse failure reports the row index and offending text.
    pub fn parse_column<T: FromStr>(
        &self,
        label: &str,
    ) -> Option<Result<Vec<T>, (usize, Box<str>)>> {
        let j = self.column_index(label)?;
        Some(
            self.rows
                .iter()
                .enumerate()
                .map(|(i, row)| row[j].parse::<T>().map_err(|_| (i, row[j].clone())))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarBlock {
    pub name: Box<str>,
    pub values: Vec<(Box<str>, Box<str>)>,
    pub table: Option<StarTable>,
}

impl StarBlock {
    pub fn with_table(name: &str, table: StarTable) -> Self {
        Self {
            name: name.into(),
            values: vec![],
            table: Some(table),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarFile {
    pub blocks: Vec<StarBlock>,
}

impl StarFile {
    pub fn block(&self, name: &str) -> Option<&StarBlock> {
        self.blocks.iter().find(|b| b.name.as_ref() == name)
    }

    /// The loop of the block called `name`
    pub fn table(&self, name: &str) -> Option<&StarTable> {
        self.block(name).and_then(|b| b.table.as_ref())
    }

    /// The loop of the unnamed `data_` block if there is one, otherwise
    /// the first loop in the file
    pub fn main_table(&self) -> Option<&StarTable> {
        self.table("")
            .or_else(|| self.blocks.iter().find_map(|b| b.table.as_ref()))
    }

    pub fn to_star_string(&self) -> String {
        let mut out = String::new();
        for block in self.blocks.iter() {
            out.push_str(&format!("\ndata_{}\n\n", block.name));

            for (k, v) in block.values.iter() {
                out.push_str(&format!("_{} {}\n", k, quote(v)));
            }
            if !block.values.is_empty() {
                out.push('\n');
            }

            if let Some(table) = &block.table {
                out.push_str("loop_\n");
                for (j, label) in table.labels.iter().enumerate() {
                    out.push_str(&format!("_{} #{}\n", label, j + 1));
                }
                for row in table.rows.iter() {
                    let words: Vec<String> = row.iter().map(|x| quote(x)).collect();
                    out.push_str(&words.join(" "));
                    out.push('\n');
                }
                out.push('\n');
            }
        }
        out
    }
}

impl FromStr for StarFile {
    type Err = StarSyntaxError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_star(text)
    }
}

#[derive(PartialEq)]
enum State {
    Block,
    LoopLabels,
    LoopRows,
}

fn parse_star(text: &str) -> Result<StarFile, StarSyntaxError> {
    let mut blocks: Vec<StarBlock> = vec![];
    let mut state = State::Block;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix("data_") {
            blocks.push(StarBlock {
                name: name.trim().into(),
                ..Default::default()
            });
            state = State::Block;
            continue;
        }

        let Some(block) = blocks.last_mut() else {
            return Err(StarSyntaxError::OutsideBlock {
                line: line_no,
                text: line.into(),
            });
        };

        if line == "loop_" {
            if block.table.is_some() {
                return Err(StarSyntaxError::DuplicateLoop {
                    line: line_no,
                    block: block.name.clone(),
                });
            }
            block.table = Some(StarTable::default());
            state = State::LoopLabels;
            continue;
        }

        let words = split_words(line).ok_or(StarSyntaxError::UnterminatedQuote { line: line_no })?;

        if line.starts_with('_') {
            let label: Box<str> = line
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_start_matches('_')
                .into();

            if state == State::LoopLabels {
                if let Some(table) = block.table.as_mut() {
                    table.labels.push(label);
                }
                continue;
            }

            // a label after the rows closes the loop
            state = State::Block;
            let value = words.get(1).ok_or(StarSyntaxError::MissingValue {
                line: line_no,
                label: label.clone(),
            })?;
            block.values.push((label, value.clone()));
            continue;
        }

        let in_loop = state != State::Block;
        match block.table.as_mut() {
            Some(table) if in_loop => {
                if table.labels.is_empty() {
                    return Err(StarSyntaxError::RowWithoutLabels { line: line_no });
                }
                if words.len() != table.labels.len() {
                    return Err(StarSyntaxError::RowWidth {
                        line: line_no,
                        expected: table.labels.len(),
                        found: words.len(),
                    });
                }
                table.rows.push(words);
                state = State::LoopRows;
            }
            _ => {
                return Err(StarSyntaxError::OutsideBlock {
                    line: line_no,
                    text: line.into(),
                });
            }
        }
    }

    Ok(StarFile { blocks })
}

/// Split a line on whitespace, keeping quoted words together. Returns
/// `None` on an unterminated quote.
fn split_words(line: &str) -> Option<Vec<Box<str>>> {
    let mut words = vec![];
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let mut end = None;
            while let Some((j, d)) = chars.next() {
                let at_boundary = chars.peek().map(|&(_, n)| n.is_whitespace()).unwrap_or(true);
                if d == c && at_boundary {
                    end = Some(j);
                    break;
                }
            }
            let end = end?;
            words.push(line[(start + 1)..end].into());
        } else {
            let mut end = line.len();
            while let Some(&(j, d)) = chars.peek() {
                if d.is_whitespace() {
                    end = j;
                    break;
                }
                chars.next();
            }
            words.push(line[start..end].into());
        }
    }

    Some(words)
}

fn quote(value: &str) -> String {
    if value.is_empty() {
        "\"\"".to_string()
    } else if value.contains(char::is_whitespace) {
        if value.contains('"') {
            format!("'{}'", value)
        } else {
            format!("\"{}\"", value)
        }
    } else {
        value.to_string()
    }
}

///
/// Read a STAR file
/// * `file_path` - either gzipped or not
///
pub fn read_star(file_path: &str) -> anyhow::Result<StarFile> {
    let text = read_to_string(file_path)?;
    text.parse::<StarFile>()
        .map_err(|e| anyhow::anyhow!("{}: {}", file_path, e))
}

///
/// Write a STAR file
/// * `file_path` - either gzipped or not; `stdout` is allowed
///
pub fn write_star(star: &StarFile, file_path: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(file_path)?;
    buf.write_all(star.to_star_string().as_bytes())?;
    buf.flush()?;
    Ok(())
}
