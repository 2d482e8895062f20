//! Result model: per-number hash results and the ordered aggregate.
//!
//! The aggregate is the sole artifact handed to a `ResultSink`. Its ordering
//! is imposed here, at construction, so scheduling nondeterminism upstream
//! never becomes observable downstream.

use serde::{Deserialize, Serialize};

/// Hash result for a single input number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub number: i64,

    /// Uppercase hex rendering of the 128-bit digest.
    pub value: String,
}

impl ConversionResult {
    pub fn new(number: i64, value: impl Into<String>) -> Self {
        Self {
            number,
            value: value.into(),
        }
    }
}

/// All results of one run, sorted ascending by input number.
///
/// Invariant: one entry per dispatched unit, strictly increasing `number`.
/// Numbers are unique within a batch, so the sort never has to break ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAggregate {
    results: Vec<ConversionResult>,
}

impl ResultAggregate {
    /// Build the aggregate from results in whatever order the workers
    /// finished. Sorting happens here and nowhere else.
    pub fn from_unordered(mut results: Vec<ConversionResult>) -> Self {
        results.sort_by_key(|r| r.number);
        Self { results }
    }

    pub fn results(&self) -> &[ConversionResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Textual payload for sinks: one `"<number>: <hash>"` line per result,
    /// ascending, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            out.push_str(&result.number.to_string());
            out.push_str(": ");
            out.push_str(&result.value);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unordered_sorts_by_number() {
        let aggregate = ResultAggregate::from_unordered(vec![
            ConversionResult::new(3, "C"),
            ConversionResult::new(1, "A"),
            ConversionResult::new(2, "B"),
        ]);

        let numbers: Vec<i64> = aggregate.results().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn negative_numbers_sort_before_positive() {
        let aggregate = ResultAggregate::from_unordered(vec![
            ConversionResult::new(1, "B"),
            ConversionResult::new(-2, "A"),
        ]);

        let numbers: Vec<i64> = aggregate.results().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![-2, 1]);
    }

    #[test]
    fn render_emits_one_line_per_result() {
        let aggregate = ResultAggregate::from_unordered(vec![
            ConversionResult::new(10, "D3D9446802A44259755D38E6D163E820"),
        ]);

        assert_eq!(aggregate.render(), "10: D3D9446802A44259755D38E6D163E820\n");
    }

    #[test]
    fn render_of_empty_aggregate_is_empty() {
        let aggregate = ResultAggregate::from_unordered(vec![]);
        assert!(aggregate.is_empty());
        assert_eq!(aggregate.render(), "");
    }
}
