//! Tandem repeat detection and the longest-repeat reduction.

use crate::bio::SequenceRecord;
use crate::tools::traits::RepeatAnnotator;
use crate::MineGraphError;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// A repeat region on one sequence; `start` is 0-based inclusive, `end` exclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatInterval {
    pub sequence_id: String,
    pub start: usize,
    pub end: usize,
    pub unit_length: usize,
}

impl RepeatInterval {
    pub fn new(
        sequence_id: &str,
        start: usize,
        end: usize,
        unit_length: usize,
    ) -> Result<Self, MineGraphError> {
        if start >= end {
            return Err(MineGraphError::Parse(format!(
                "repeat on {} has start {} >= end {}",
                sequence_id, start, end
            )));
        }
        Ok(Self {
            sequence_id: sequence_id.to_string(),
            start,
            end,
            unit_length,
        })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Longest interval length, if any interval exists
pub fn longest_repeat(intervals: &[RepeatInterval]) -> Option<usize> {
    intervals.iter().map(RepeatInterval::len).max()
}

/// Segment length candidate: the longest repeat, or `fallback` when none were found
pub fn segment_length_candidate(intervals: &[RepeatInterval], fallback: usize) -> usize {
    longest_repeat(intervals).unwrap_or(fallback)
}

#[derive(Debug, Clone, Serialize)]
pub struct RepeatEstimate {
    pub intervals: Vec<RepeatInterval>,
    pub longest_repeat: Option<usize>,
    pub segment_length: usize,
    /// Sequences whose annotation failed and were left out of the reduction
    pub excluded: Vec<String>,
}

/// Annotate every record in parallel and reduce to a segment length candidate.
///
/// A failing sequence is logged and excluded; it never aborts the run.
pub fn estimate_repeats(
    records: &[SequenceRecord],
    annotator: &dyn RepeatAnnotator,
    fallback: usize,
    show_progress: bool,
) -> RepeatEstimate {
    info!(
        "Annotating tandem repeats in {} sequences with {}",
        records.len(),
        annotator.name()
    );

    let pb = if show_progress {
        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} repeats {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let results: Vec<(String, Result<Vec<RepeatInterval>, MineGraphError>)> = records
        .par_iter()
        .map(|record| {
            let result = annotator.annotate(record);
            pb.inc(1);
            (record.id().to_string(), result)
        })
        .collect();
    pb.finish_and_clear();

    let mut intervals = Vec::new();
    let mut excluded = Vec::new();
    for (id, result) in results {
        match result {
            Ok(found) => {
                debug!("{}: {} repeats", id, found.len());
                intervals.extend(found);
            }
            Err(e) => {
                warn!("Repeat annotation failed for {}, excluding it: {}", id, e);
                excluded.push(id);
            }
        }
    }

    let longest = longest_repeat(&intervals);
    let segment_length = longest.unwrap_or(fallback);
    match longest {
        Some(len) => info!("Longest tandem repeat: {} bp", len),
        None => info!(
            "No tandem repeats found, using fallback segment length {}",
            fallback
        ),
    }

    RepeatEstimate {
        intervals,
        longest_repeat: longest,
        segment_length,
        excluded,
    }
}

/// In-process exact tandem repeat scanner.
///
/// For each period `p` it finds maximal runs where `s[i] == s[i + p]`; a run of
/// `m` matches spans `m + p` bases and `(m + p) / p` copies of the unit.
#[derive(Debug, Clone)]
pub struct TandemRepeatScanner {
    pub max_period: usize,
    pub min_copies: usize,
    pub min_length: usize,
}

impl TandemRepeatScanner {
    pub fn new(max_period: usize, min_copies: usize, min_length: usize) -> Self {
        Self {
            max_period,
            min_copies,
            min_length,
        }
    }

    pub fn scan(&self, id: &str, seq: &[u8]) -> Vec<RepeatInterval> {
        let mut found = Vec::new();

        for period in 1..=self.max_period.min(seq.len() / 2) {
            let mut i = 0;
            while i + period < seq.len() {
                if !matches_at(seq, i, period) {
                    i += 1;
                    continue;
                }
                let run_start = i;
                while i + period < seq.len() && matches_at(seq, i, period) {
                    i += 1;
                }
                let span = (i - run_start) + period;
                let copies = span / period;

                if span >= self.min_length
                    && copies >= self.min_copies
                    && is_primitive(&seq[run_start..run_start + period])
                {
                    found.push(RepeatInterval {
                        sequence_id: id.to_string(),
                        start: run_start,
                        end: run_start + span,
                        unit_length: period,
                    });
                }
            }
        }

        found.sort_by_key(|r| (r.start, r.end, r.unit_length));
        found
    }
}

#[inline]
fn matches_at(seq: &[u8], i: usize, period: usize) -> bool {
    let (a, b) = (seq[i], seq[i + period]);
    a == b && a != b'N'
}

/// True when `unit` is not a repetition of a shorter unit
fn is_primitive(unit: &[u8]) -> bool {
    let n = unit.len();
    !(1..n)
        .filter(|d| n % d == 0)
        .any(|d| unit.chunks(d).all(|c| c == &unit[..d]))
}

impl RepeatAnnotator for TandemRepeatScanner {
    fn name(&self) -> &str {
        "tandem-scanner"
    }

    fn annotate(&self, record: &SequenceRecord) -> Result<Vec<RepeatInterval>, MineGraphError> {
        Ok(self.scan(record.id(), record.sequence()))
    }
}
