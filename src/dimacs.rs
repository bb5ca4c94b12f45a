//! DIMACS min-cost flow text format, extended with delta batches for incremental solving.
//!
//! Every line starts with a one-letter type. `c EOI` ends an iteration: the original graph, each
//! delta batch and each exported solution are terminated by it.

mod exporter;
mod incremental;
mod original;
mod solution;

pub use exporter::{ExportOptions, Exporter, PotentialSign};
pub use incremental::IncrementalImporter;
pub use original::OriginalImporter;
pub use solution::{Solution, SolutionImporter};

use crate::error::FlowError;
use std::io::BufRead;
use std::str::{FromStr, SplitWhitespace};

pub const END_OF_ITERATION: &str = "EOI";

/// One non-empty input line split into its type letter and fields.
pub(crate) struct Line<'a> {
    pub(crate) number: usize,
    pub(crate) kind: &'a str,
    fields: SplitWhitespace<'a>,
}

impl<'a> Line<'a> {
    pub(crate) fn is_end_of_iteration(&self) -> bool {
        self.kind == "c" && self.fields.clone().next() == Some(END_OF_ITERATION)
    }

    pub(crate) fn next<T: FromStr>(&mut self, name: &str) -> Result<T, FlowError> {
        let number = self.number;
        let field = self.fields.next().ok_or_else(|| FlowError::parse(number, format!("missing {}", name)))?;
        field.parse().map_err(|_| FlowError::parse(number, format!("invalid {} '{}'", name, field)))
    }

    pub(crate) fn finish(mut self) -> Result<(), FlowError> {
        match self.fields.next() {
            None => Ok(()),
            Some(field) => Err(FlowError::parse(self.number, format!("unexpected field '{}'", field))),
        }
    }
}

/// Reads lines one at a time so that a stream can be consumed batch by batch.
pub(crate) struct LineReader<R> {
    reader: R,
    buffer: String,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        LineReader { reader, buffer: String::new(), line_number: 0 }
    }

    /// The next non-blank line, or `None` at end of input.
    pub(crate) fn next_line(&mut self) -> Result<Option<Line<'_>>, FlowError> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if !self.buffer.trim().is_empty() {
                break;
            }
        }

        let mut fields = self.buffer.split_whitespace();
        let kind = fields.next().unwrap_or_default();
        Ok(Some(Line { number: self.line_number, kind, fields }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    fn skips_blank_lines_and_counts_them() {
        let mut reader = LineReader::new("\n\na 1 2\n  \nc EOI\n".as_bytes());

        let mut line = reader.next_line().unwrap().unwrap();
        assert_eq!((line.number, line.kind), (3, "a"));
        assert_eq!(line.next::<usize>("src").unwrap(), 1);
        assert!(line.next::<i64>("dst").is_ok());
        assert!(matches!(line.next::<i64>("cost"), Err(FlowError::Parse { line: 3, .. })));

        let line = reader.next_line().unwrap().unwrap();
        assert!(line.is_end_of_iteration());
        assert_eq!(line.number, 5);
        assert!(reader.next_line().unwrap().is_none());
    }

    #[rstest]
    #[case("n x 1")]
    #[case("n 1 2 3")]
    fn rejects_bad_fields(#[case] input: &str) {
        let mut reader = LineReader::new(input.as_bytes());
        let mut line = reader.next_line().unwrap().unwrap();
        let parsed = line.next::<usize>("id").and_then(|_| line.next::<i64>("supply")).and_then(|_| line.finish());
        assert!(matches!(parsed, Err(FlowError::Parse { line: 1, .. })));
    }
}
