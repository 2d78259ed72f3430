//! Timing samples and reporters.
//!
//! Every timed phase yields one [`TimingSample`]. Samples are streamed to a
//! [`Reporter`] as they are produced and folded into a [`RunSummary`].

use std::fmt;
use std::time::Duration;

use comfy_table::{Cell, Table};

use crate::error::{Error, Result};
use crate::selection::BackendKind;

/// Which half of the benchmark a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Write,
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => write!(f, "write"),
            Phase::Read => write!(f, "read"),
        }
    }
}

/// Operation outcomes within one sample.
///
/// A lookup miss is a successful read: it counts as `succeeded` and `misses`,
/// never as `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub hits: usize,
    pub misses: usize,
}

impl Tally {
    pub fn record_write(&mut self, result: &Result<()>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn record_read<T>(&mut self, result: &Result<T>) {
        self.attempted += 1;
        match result {
            Ok(_) => {
                self.succeeded += 1;
                self.hits += 1;
            }
            Err(err) if err.is_not_found() => {
                self.succeeded += 1;
                self.misses += 1;
            }
            Err(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &Tally) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.hits += other.hits;
        self.misses += other.misses;
    }

    /// Fraction of reads that found a record, if any reads completed.
    pub fn hit_rate(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }
}

/// Elapsed wall-clock time of one timed phase.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSample {
    pub backend: BackendKind,
    pub phase: Phase,
    /// Read round, starting at 1. Always 0 for writes.
    pub round: usize,
    pub elapsed: Duration,
    pub tally: Tally,
}

/// Render a sample as a single human-readable line.
pub fn format_sample(sample: &TimingSample) -> String {
    let millis = sample.elapsed.as_secs_f64() * 1000.0;
    match sample.phase {
        Phase::Write => format!(
            "{}: wrote {} of {} records in {:.3} ms ({} failed)",
            sample.backend,
            sample.tally.succeeded,
            sample.tally.attempted,
            millis,
            sample.tally.failed
        ),
        Phase::Read => format!(
            "{}: read round {}: {} lookups in {:.3} ms ({} hits, {} misses, {} failed)",
            sample.backend,
            sample.round,
            sample.tally.attempted,
            millis,
            sample.tally.hits,
            sample.tally.misses,
            sample.tally.failed
        ),
    }
}

/// Sink for benchmark output.
pub trait Reporter: Send {
    /// Called once per timed phase.
    fn sample(&mut self, sample: &TimingSample);

    /// Called when a backend is dropped from the run.
    fn unavailable(&mut self, _backend: BackendKind, _error: &Error) {}

    /// Called once after the last backend.
    fn finish(&mut self, _summary: &RunSummary) {}
}

/// Prints samples and a closing summary table to stdout.
#[derive(Debug, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn sample(&mut self, sample: &TimingSample) {
        println!("{}", format_sample(sample));
    }

    fn unavailable(&mut self, backend: BackendKind, error: &Error) {
        println!("{}: unavailable ({})", backend, error);
    }

    fn finish(&mut self, summary: &RunSummary) {
        if summary.totals.is_empty() && summary.unavailable.is_empty() {
            println!("No backends selected");
            return;
        }
        if !summary.totals.is_empty() {
            println!();
            println!("{}", summary.to_table());
        }
        for (backend, reason) in &summary.unavailable {
            println!("skipped {}: {}", backend, reason);
        }
    }
}

/// Keeps samples in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub samples: Vec<TimingSample>,
    pub unavailable: Vec<BackendKind>,
    pub finished: bool,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for CollectingReporter {
    fn sample(&mut self, sample: &TimingSample) {
        self.samples.push(sample.clone());
    }

    fn unavailable(&mut self, backend: BackendKind, _error: &Error) {
        self.unavailable.push(backend);
    }

    fn finish(&mut self, _summary: &RunSummary) {
        self.finished = true;
    }
}

/// Accumulated time and outcomes of one phase on one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTotals {
    pub backend: BackendKind,
    pub phase: Phase,
    pub samples: usize,
    pub elapsed: Duration,
    pub tally: Tally,
}

impl PhaseTotals {
    /// Mean time per attempted operation.
    pub fn mean_per_op(&self) -> Option<Duration> {
        let ops = u32::try_from(self.tally.attempted).ok().filter(|&n| n > 0)?;
        Some(self.elapsed / ops)
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Totals in the order the phases first ran.
    pub totals: Vec<PhaseTotals>,
    pub unavailable: Vec<(BackendKind, String)>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: &TimingSample) {
        match self
            .totals
            .iter_mut()
            .find(|t| t.backend == sample.backend && t.phase == sample.phase)
        {
            Some(totals) => {
                totals.samples += 1;
                totals.elapsed += sample.elapsed;
                totals.tally.merge(&sample.tally);
            }
            None => self.totals.push(PhaseTotals {
                backend: sample.backend,
                phase: sample.phase,
                samples: 1,
                elapsed: sample.elapsed,
                tally: sample.tally,
            }),
        }
    }

    pub fn mark_unavailable(&mut self, backend: BackendKind, error: &Error) {
        self.unavailable.push((backend, error.to_string()));
    }

    pub fn totals_for(&self, backend: BackendKind, phase: Phase) -> Option<&PhaseTotals> {
        self.totals
            .iter()
            .find(|t| t.backend == backend && t.phase == phase)
    }

    pub fn is_unavailable(&self, backend: BackendKind) -> bool {
        self.unavailable.iter().any(|(b, _)| *b == backend)
    }

    /// Summary table, one row per backend and phase.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec![
            "Backend", "Phase", "Samples", "Ops", "Failed", "Hit rate", "Total ms", "Mean µs/op",
        ]);

        for totals in &self.totals {
            let hit_rate = match (totals.phase, totals.tally.hit_rate()) {
                (Phase::Read, Some(rate)) => format!("{:.1}%", rate * 100.0),
                _ => "-".to_string(),
            };
            let mean = totals
                .mean_per_op()
                .map(|d| format!("{:.1}", d.as_secs_f64() * 1_000_000.0))
                .unwrap_or_else(|| "-".to_string());

            table.add_row(vec![
                Cell::new(totals.backend),
                Cell::new(totals.phase),
                Cell::new(totals.samples),
                Cell::new(totals.tally.attempted),
                Cell::new(totals.tally.failed),
                Cell::new(hit_rate),
                Cell::new(format!("{:.3}", totals.elapsed.as_secs_f64() * 1000.0)),
                Cell::new(mean),
            ]);
        }

        table
    }
}
