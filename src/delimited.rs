//! Delimited text (CSV-like) reading and writing.
//!
//! Every line read is a cancellation checkpoint: a cancelled token stops the
//! load with [`LoadError::Cancelled`] before the next line is parsed.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use log::{debug, warn};

use crate::cancel::{CancelToken, Cancelled};
use crate::matrix::{DataOrder, Matrix};

/// Errors from loading delimited data
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line}: cannot parse '{token}'")]
    Parse { line: usize, token: String },
    #[error("Line {line}: expected {expected} fields, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

pub struct DelimitedReader<R: BufRead> {
    reader: R,
    delimiter: char,
    order: DataOrder,
    token: CancelToken,
    line_no: usize,
}

impl<R: BufRead> DelimitedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            delimiter: ',',
            order: DataOrder::RowMajor,
            token: CancelToken::never(),
            line_no: 0,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_order(mut self, order: DataOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    /// Discard the next `count` lines (headers, comments).
    pub fn skip_lines(&mut self, count: usize) -> Result<(), LoadError> {
        for _ in 0..count {
            if self.next_line()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// All remaining values as one flat vector.
    pub fn read_vector<T: FromStr>(&mut self) -> Result<Vec<T>, LoadError> {
        let mut values = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            values.extend(self.parse_fields::<T>(&line)?);
        }
        Ok(values)
    }

    /// Remaining lines as matrix rows, stored in the configured order.
    pub fn read_matrix<T: FromStr + Clone>(&mut self) -> Result<Matrix<T>, LoadError> {
        let mut rows: Vec<Vec<T>> = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            let row = self.parse_fields::<T>(&line)?;
            if let Some(first) = rows.first() {
                if row.len() != first.len() {
                    return Err(LoadError::Ragged {
                        line: self.line_no,
                        expected: first.len(),
                        found: row.len(),
                    });
                }
            }
            rows.push(row);
        }
        debug!("Read {} rows ending at line {}", rows.len(), self.line_no);
        let expected = rows.first().map_or(0, Vec::len);
        Matrix::from_rows(rows, self.order).map_err(|_| LoadError::Ragged {
            line: self.line_no,
            expected,
            found: expected,
        })
    }

    /// Remaining non-blank lines, one string each.
    pub fn read_string_list(&mut self) -> Result<Vec<String>, LoadError> {
        let mut strings = Vec::new();
        while let Some(line) = self.next_line()? {
            if !line.trim().is_empty() {
                strings.push(line);
            }
        }
        Ok(strings)
    }

    fn next_line(&mut self) -> Result<Option<String>, LoadError> {
        if let Err(cancelled) = self.token.check() {
            warn!("Cancellation requested, stopping load at line {}", self.line_no + 1);
            return Err(cancelled.into());
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn parse_fields<T: FromStr>(&self, line: &str) -> Result<Vec<T>, LoadError> {
        line.split(self.delimiter)
            .map(str::trim)
            .map(|field| {
                field.parse::<T>().map_err(|_| LoadError::Parse {
                    line: self.line_no,
                    token: field.to_string(),
                })
            })
            .collect()
    }
}

pub struct DelimitedWriter<W: Write> {
    writer: W,
    delimiter: char,
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            delimiter: ',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// One value per line.
    pub fn write_vector<T: Display>(&mut self, values: &[T]) -> io::Result<()> {
        for value in values {
            writeln!(self.writer, "{}", value)?;
        }
        self.writer.flush()
    }

    /// One matrix row per line, whatever the storage order.
    pub fn write_matrix<T: Display>(&mut self, matrix: &Matrix<T>) -> io::Result<()> {
        let separator = self.delimiter.to_string();
        for r in 0..matrix.rows() {
            let line = matrix
                .row(r)
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(&separator);
            writeln!(self.writer, "{}", line)?;
        }
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::leaked_flag;

    fn reader(input: &str) -> DelimitedReader<&[u8]> {
        DelimitedReader::new(input.as_bytes())
    }

    #[test]
    fn test_read_matrix() {
        let m: Matrix<f64> = reader("1, 2\n3,4\n\n5,6\n").read_matrix().unwrap();
        assert_eq!((m.rows(), m.cols()), (3, 2));
        assert_eq!(m.get(2, 1), Some(&6.0));
    }

    #[test]
    fn test_read_matrix_column_major() {
        let m: Matrix<i32> = reader("1,2\n3,4\n")
            .with_order(DataOrder::ColumnMajor)
            .read_matrix()
            .unwrap();
        assert_eq!(m.data(), &[1, 3, 2, 4]);
    }

    #[test]
    fn test_custom_delimiter_and_skip() {
        let mut r = reader("a;b\n# units\n1;2\r\n").with_delimiter(';');
        r.skip_lines(2).unwrap();
        let m: Matrix<u8> = r.read_matrix().unwrap();
        assert_eq!(m.data(), &[1, 2]);
    }

    #[test]
    fn test_skip_past_end() {
        let mut r = reader("1\n");
        r.skip_lines(5).unwrap();
        assert!(r.read_vector::<i64>().unwrap().is_empty());
    }

    #[test]
    fn test_read_vector_flattens_lines() {
        let v: Vec<i64> = reader("1,2\n3\n").read_vector().unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = reader("1,2\n3,x\n").read_matrix::<f32>().unwrap_err();
        match err {
            LoadError::Parse { line, token } => {
                assert_eq!(line, 2);
                assert_eq!(token, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ragged_rows() {
        let err = reader("1,2\n3\n").read_matrix::<f64>().unwrap_err();
        assert!(matches!(
            err,
            LoadError::Ragged {
                line: 2,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_string_list() {
        let strings = reader("ACGT\n\nTTA\n").read_string_list().unwrap();
        assert_eq!(strings, vec!["ACGT", "TTA"]);
    }

    #[test]
    fn test_whitespace_only_lines_are_blank() {
        let strings = reader("ACGT\n   \n\t\nTTA\n").read_string_list().unwrap();
        assert_eq!(strings, vec!["ACGT", "TTA"]);

        let m: Matrix<f64> = reader("1,2\n  \t \n3,4\n").read_matrix().unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 2));
        assert_eq!(m.get(1, 0), Some(&3.0));
    }

    #[test]
    fn test_cancelled_token_stops_load() {
        let flag = leaked_flag();
        flag.set();
        let err = reader("1,2\n")
            .with_cancel_token(flag.token())
            .read_matrix::<f64>()
            .unwrap_err();
        assert!(matches!(err, LoadError::Cancelled(_)));
    }

    #[test]
    fn test_writer_matches_reader_format() {
        let m = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]], DataOrder::ColumnMajor).unwrap();
        let mut writer = DelimitedWriter::new(Vec::new()).with_delimiter('\t');
        writer.write_matrix(&m).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "1\t2\n3\t4\n");

        let mut writer = DelimitedWriter::new(Vec::new());
        writer.write_vector(&[0.5, 1.5]).unwrap();
        assert_eq!(writer.into_inner(), b"0.5\n1.5\n");
    }
}
