//! Parsing of clip position selectors such as `2,4:10`.
//!
//! Positions are 1-based recency positions: 1 is the newest clip. A selector
//! is the union of its tokens; each token is either a single position or an
//! inclusive range `a:b` with `1 <= a <= b`.

use std::fmt;
use std::str::FromStr;

/// Malformed selector text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorParseError {
    #[error("empty selector")]
    Empty,

    #[error("empty entry in selector '{0}'")]
    EmptyToken(String),

    #[error("invalid position '{0}'")]
    InvalidNumber(String),

    #[error("positions start at 1, got 0")]
    Zero,

    #[error("range {start}:{end} is reversed")]
    ReversedRange { start: usize, end: usize },
}

/// A set of recency positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    ranges: Vec<(usize, usize)>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        if input.trim().is_empty() {
            return Err(SelectorParseError::Empty);
        }

        let mut ranges = Vec::new();
        for token in input.split(',') {
            let token = token.trim();
            if token.is_empty() {
                return Err(SelectorParseError::EmptyToken(input.to_string()));
            }
            let range = match token.split_once(':') {
                Some((start, end)) => {
                    let start = parse_position(start)?;
                    let end = parse_position(end)?;
                    if start > end {
                        return Err(SelectorParseError::ReversedRange { start, end });
                    }
                    (start, end)
                }
                None => {
                    let position = parse_position(token)?;
                    (position, position)
                }
            };
            ranges.push(range);
        }
        Ok(Self { ranges })
    }

    fn contains(&self, position: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| (start..=end).contains(&position))
    }

    /// Map positions to row ids.
    ///
    /// `ids_newest_first` is the current recency ordering. Positions beyond
    /// its length are dropped.
    pub fn resolve(&self, ids_newest_first: &[i64]) -> Vec<i64> {
        ids_newest_first
            .iter()
            .enumerate()
            .filter(|(index, _)| self.contains(index + 1))
            .map(|(_, &id)| id)
            .collect()
    }
}

fn parse_position(text: &str) -> Result<usize, SelectorParseError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SelectorParseError::InvalidNumber(text.to_string()));
    }
    let position: usize = text
        .parse()
        .map_err(|_| SelectorParseError::InvalidNumber(text.to_string()))?;
    if position == 0 {
        return Err(SelectorParseError::Zero);
    }
    Ok(position)
}

impl FromStr for Selector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &(start, end)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
        }
        Ok(())
    }
}
