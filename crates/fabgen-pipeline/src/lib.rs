//! Staged, parallel configuration build pipeline.
//!
//! The pipeline turns per-device input variables into rendered device
//! configurations in four stages: input validation over the whole fabric,
//! a single fabric-wide fact derivation, per-target structured-config
//! builds, and per-target rendering. Stages are separated by all-before-any
//! barriers; device-level work inside a stage fans out across a bounded
//! blocking worker pool.
//!
//! [`PipelineDriver`] is the entry point; callers supply a
//! [`fabgen_types::ConfigEngine`] implementation and [`BuildOptions`].

mod artifact;
mod build;
mod driver;
mod facts;
mod pool;
mod render;
mod validate;

pub use artifact::{rendered_config_path, structured_config_path};
pub use build::BuiltDevice;
pub use driver::{default_workers, BuildOptions, PipelineDriver, RunState};
pub use pool::WorkerPool;
pub use validate::ValidatedInputs;
