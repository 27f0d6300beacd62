//! Render stage: per-device textual config rendering and persistence.
//!
//! No validation happens here; a rendering or write failure is fatal for that
//! device only and lands in the report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fabgen_types::{ConfigEngine, DeviceName, FabgenError, Result, StructuredConfig};

use crate::artifact;
use crate::pool::WorkerPool;

pub(crate) async fn run(
    pool: &WorkerPool,
    engine: &Arc<dyn ConfigEngine>,
    configs: BTreeMap<DeviceName, StructuredConfig>,
    rendered_dir: &Path,
) -> BTreeMap<DeviceName, Result<()>> {
    let mut units = Vec::with_capacity(configs.len());
    for (device, config) in configs {
        let engine = Arc::clone(engine);
        let dir: PathBuf = rendered_dir.to_path_buf();
        let unit_device = device.clone();
        units.push((device, move || {
            let text = engine
                .render_config(&config)
                .map_err(|err| FabgenError::Render {
                    device: unit_device.clone(),
                    message: err.to_string(),
                })?;
            let path = artifact::rendered_config_path(&dir, &unit_device);
            artifact::write_text(&path, &text)?;
            tracing::debug!(device = %unit_device, path = %path.display(), "wrote device config");
            Ok(())
        }));
    }

    pool.run_units(units).await.into_iter().collect()
}
