//! Benchmark runner.
//!
//! A run walks the selected backends in [`BackendKind::ALL`] order and moves
//! through `Idle -> Connecting -> WritePhase -> ReadPhase -> Idle` for each.
//! Stopwatches wrap only the dispatched operations: connecting, schema setup,
//! warm-up, record generation and key drawing all happen outside them.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backends::{read_deadline, Backend, Connector};
use crate::config::BenchConfig;
use crate::error::{Error, Result};
use crate::fixtures::{JobGenerator, JobRecord};
use crate::report::{Phase, Reporter, RunSummary, Tally, TimingSample};
use crate::selection::BackendKind;

/// Where the runner currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Connecting(BackendKind),
    WritePhase(BackendKind),
    ReadPhase(BackendKind),
}

/// Drives one benchmark run over a [`Connector`].
pub struct Runner<C> {
    config: BenchConfig,
    connector: C,
    state: RunState,
}

impl<C: Connector> Runner<C> {
    pub fn new(config: BenchConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            state: RunState::Idle,
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every selected backend and return the summary.
    ///
    /// Backend failures never abort the run: a backend that cannot connect
    /// or set up is reported unavailable, and failed operations are tallied.
    pub async fn run(
        &mut self,
        generator: &JobGenerator,
        reporter: &mut dyn Reporter,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::new();
        let kinds: Vec<BackendKind> = self.config.backends.iter().collect();

        if kinds.is_empty() {
            tracing::info!("no backends selected");
            reporter.finish(&summary);
            return Ok(summary);
        }

        self.config.connections.validate(&self.config.backends)?;
        self.connector.validate(&self.config.backends)?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let records = if self.config.write_phase {
            generator.generate(self.config.record_count, &mut rng)
        } else {
            Vec::new()
        };
        tracing::info!(
            records = records.len(),
            backends = %self.config.backends,
            "dataset generated"
        );

        for kind in kinds {
            match self.run_backend(kind, &records, &mut rng, reporter, &mut summary).await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    self.state = RunState::Idle;
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(backend = %kind, error = %err, "backend unavailable");
                    reporter.unavailable(kind, &err);
                    summary.mark_unavailable(kind, &err);
                }
            }
            self.state = RunState::Idle;
        }

        reporter.finish(&summary);
        Ok(summary)
    }

    async fn run_backend(
        &mut self,
        kind: BackendKind,
        records: &[JobRecord],
        rng: &mut StdRng,
        reporter: &mut dyn Reporter,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let timeout = self.config.op_timeout;

        self.state = RunState::Connecting(kind);
        tracing::debug!(backend = %kind, "connecting");
        let backend = setup_step(kind, timeout, self.connector.connect(kind)).await?;

        if self.config.write_phase {
            setup_step(kind, timeout, backend.prepare()).await?;
            setup_step(kind, timeout, backend.warm_up()).await?;

            self.state = RunState::WritePhase(kind);
            let sample = write_phase(backend.as_ref(), records, timeout).await;
            emit(reporter, summary, &sample);
        }

        if self.config.read_phase {
            self.state = RunState::ReadPhase(kind);
            let key_space = self.config.lookup_key_space();
            for round in 1..=self.config.read_rounds {
                let keys = draw_keys(rng, self.config.lookups_per_round, key_space);
                let sample = read_round(backend.as_ref(), round, &keys, timeout).await;
                emit(reporter, summary, &sample);
            }
        }

        Ok(())
    }
}

/// Bound an untimed setup step; any failure takes the backend out of the run.
async fn setup_step<T, F>(kind: BackendKind, timeout: Duration, op: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err @ Error::Connection { .. })) => Err(err),
        Ok(Err(err)) if err.is_fatal() => Err(err),
        Ok(Err(err)) => Err(Error::connection(kind, err)),
        Err(_) => Err(Error::connection(
            kind,
            format!("setup timed out after {:?}", timeout),
        )),
    }
}

/// One timed interval wrapping every insert.
pub async fn write_phase(
    backend: &dyn Backend,
    records: &[JobRecord],
    timeout: Duration,
) -> TimingSample {
    let start = Instant::now();
    let results = backend.insert_many(records, timeout).await;
    let elapsed = start.elapsed();

    let mut tally = Tally::default();
    for result in &results {
        if let Err(err) = result {
            tracing::debug!(backend = %backend.kind(), error = %err, "write failed");
        }
        tally.record_write(result);
    }

    TimingSample {
        backend: backend.kind(),
        phase: Phase::Write,
        round: 0,
        elapsed,
        tally,
    }
}

/// One timed read round over pre-drawn keys.
pub async fn read_round(
    backend: &dyn Backend,
    round: usize,
    keys: &[u64],
    timeout: Duration,
) -> TimingSample {
    let mut tally = Tally::default();
    let mut errors = Vec::new();

    let start = Instant::now();
    for &key in keys {
        let result = read_deadline(timeout, backend.get(key)).await;
        tally.record_read(&result);
        if let Err(err) = result {
            if !err.is_not_found() {
                errors.push((key, err));
            }
        }
    }
    let elapsed = start.elapsed();

    for (key, err) in &errors {
        tracing::debug!(backend = %backend.kind(), key = *key, error = %err, "read failed");
    }

    TimingSample {
        backend: backend.kind(),
        phase: Phase::Read,
        round,
        elapsed,
        tally,
    }
}

/// Draw `count` lookup keys uniformly from `0..key_space`.
pub fn draw_keys<R: Rng + ?Sized>(rng: &mut R, count: usize, key_space: u64) -> Vec<u64> {
    if key_space == 0 {
        return Vec::new();
    }
    (0..count).map(|_| rng.gen_range(0..key_space)).collect()
}

fn emit(reporter: &mut dyn Reporter, summary: &mut RunSummary, sample: &TimingSample) {
    tracing::info!(
        backend = %sample.backend,
        phase = %sample.phase,
        round = sample.round,
        elapsed_ms = sample.elapsed.as_secs_f64() * 1000.0,
        failed = sample.tally.failed,
        "phase complete"
    );
    reporter.sample(sample);
    summary.record(sample);
}
