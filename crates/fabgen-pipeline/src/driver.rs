//! Pipeline driver: sequences the four stages, owns the worker pool, and
//! applies the strict-mode policy.
//!
//! The run is modeled as an explicit state machine so the all-before-any
//! barrier between stages is a checked transition, not a side effect of
//! sequential code:
//!
//! ```text
//! Validating -> FactsReady -> Building -> Rendering -> Done
//!      \             \
//!       +-> Aborted <-+
//! ```
//!
//! A fatal condition in validation or fact derivation aborts the whole run
//! after the dispatched batch drains. Failures in build or render are
//! per-device: siblings keep running, the run completes, and the report
//! carries the failures.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fabgen_types::{
    BuildReport, ConfigEngine, DeviceName, FabgenError, Result, VariableSet,
};

use crate::artifact;
use crate::pool::WorkerPool;
use crate::{build, facts, render, validate};

/// Worker count used when the caller does not specify one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Output layout and run policy for one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub structured_dir: PathBuf,
    pub rendered_dir: PathBuf,
    /// When set, the facts artifact is written here before build starts.
    pub facts_path: Option<PathBuf>,
    pub strict: bool,
    pub workers: usize,
}

impl BuildOptions {
    /// Standard layout under one output directory: structured configs in
    /// `structured_configs/`, rendered configs in `configs/`.
    pub fn new(output_dir: &Path) -> Self {
        Self {
            structured_dir: output_dir.join("structured_configs"),
            rendered_dir: output_dir.join("configs"),
            facts_path: None,
            strict: false,
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Validating,
    FactsReady,
    Building,
    Rendering,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Validating => "validating",
            RunState::FactsReady => "facts_ready",
            RunState::Building => "building",
            RunState::Rendering => "rendering",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Drives one build run over a fabric.
pub struct PipelineDriver {
    engine: Arc<dyn ConfigEngine>,
    options: BuildOptions,
    state: RunState,
}

impl PipelineDriver {
    pub fn new(engine: Arc<dyn ConfigEngine>, options: BuildOptions) -> Self {
        Self {
            engine,
            options,
            state: RunState::Validating,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the full pipeline: validate every fabric device, derive facts,
    /// then build and render the target subset.
    ///
    /// Returns `Err` only for run-aborting conditions; per-device failures
    /// are reported through the returned [`BuildReport`].
    pub async fn run(
        &mut self,
        fabric: BTreeMap<DeviceName, VariableSet>,
        targets: BTreeSet<DeviceName>,
    ) -> Result<BuildReport> {
        self.state = RunState::Validating;
        match self.run_to_completion(fabric, targets).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.transition(RunState::Aborted);
                tracing::error!(error = %err, "pipeline run aborted");
                Err(err)
            }
        }
    }

    async fn run_to_completion(
        &mut self,
        fabric: BTreeMap<DeviceName, VariableSet>,
        targets: BTreeSet<DeviceName>,
    ) -> Result<BuildReport> {
        // A target outside the fabric is a usage error, not a silent skip.
        for device in &targets {
            if !fabric.contains_key(device) {
                return Err(FabgenError::UnknownTarget {
                    device: device.clone(),
                });
            }
        }

        // The pool lives for exactly one run; every stage drains its batch
        // before the next starts, so dropping it at the end of this function
        // releases fully idle workers.
        let pool = WorkerPool::new(self.options.workers);
        tracing::debug!(
            workers = pool.workers(),
            devices = fabric.len(),
            targets = targets.len(),
            strict = self.options.strict,
            "starting pipeline run"
        );

        let mut report = BuildReport::default();

        // Stage 1: validate every fabric device's inputs.
        let started = Instant::now();
        let validated = validate::run(&pool, &self.engine, fabric, self.options.strict).await?;
        report.timings.validate = started.elapsed();
        tracing::debug!(
            elapsed_ms = report.timings.validate.as_millis() as u64,
            "input validation complete"
        );
        for (device, outcome) in &validated.outcomes {
            if outcome.failed() || !outcome.warnings.is_empty() {
                report.record_outcome(device, outcome.clone());
            }
        }

        // Stage 2: the global barrier. One reduction over the whole fabric.
        let started = Instant::now();
        let (mut validated_inputs, facts) = facts::run(&self.engine, validated.inputs).await?;
        report.timings.facts = started.elapsed();
        tracing::debug!(
            elapsed_ms = report.timings.facts.as_millis() as u64,
            "fact derivation complete"
        );
        self.transition(RunState::FactsReady);

        if let Some(path) = &self.options.facts_path {
            artifact::write_yaml(path, &facts)?;
            tracing::info!(path = %path.display(), "wrote fabric facts artifact");
        }

        // Stage 3: build the target subset against the shared facts.
        self.transition(RunState::Building);
        let started = Instant::now();
        let built = build::run(
            &pool,
            &self.engine,
            &targets,
            &mut validated_inputs,
            &facts,
            &self.options.structured_dir,
            self.options.strict,
        )
        .await;
        report.timings.build = started.elapsed();
        report.processed = built.len();

        let mut to_render = BTreeMap::new();
        for (device, result) in built {
            match result {
                Ok(device_build) => {
                    if device_build.outcome.failed() || !device_build.outcome.warnings.is_empty() {
                        report.record_outcome(&device, device_build.outcome.clone());
                    }
                    to_render.insert(device, device_build.config);
                }
                Err(err) => report.record_failure(&device, err.into_outcome()),
            }
        }
        tracing::debug!(
            elapsed_ms = report.timings.build.as_millis() as u64,
            "structured config build complete"
        );

        // Stage 4: render everything that still holds a structured config.
        self.transition(RunState::Rendering);
        let started = Instant::now();
        let rendered = render::run(&pool, &self.engine, to_render, &self.options.rendered_dir).await;
        for (device, result) in rendered {
            if let Err(err) = result {
                report.record_failure(&device, err.into_outcome());
            }
        }
        report.timings.render = started.elapsed();
        tracing::debug!(
            elapsed_ms = report.timings.render.as_millis() as u64,
            "config rendering complete"
        );

        self.transition(RunState::Done);
        tracing::info!(
            processed = report.processed,
            failed = report.failed.len(),
            "pipeline run complete"
        );
        Ok(report)
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "pipeline state transition");
        self.state = next;
    }
}
