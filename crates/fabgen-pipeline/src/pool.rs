//! Bounded worker pool for per-device units of work.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use fabgen_types::{DeviceName, FabgenError, Result};

/// A fixed-size pool of blocking workers shared across all stages of one run.
///
/// Workers are stateless and hold no affinity to a particular device between
/// stages; concurrency is bounded by a semaphore with one permit per worker.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Submit one blocking unit per device and wait for every unit to finish.
    ///
    /// This is the stage barrier: the call returns only once all units have
    /// completed, success or failure, so no caller can start the next stage
    /// on a partial result set. Completion order within the batch is
    /// arbitrary; the caller re-keys results by device name.
    ///
    /// A panicking unit is normalized to [`FabgenError::Worker`] rather than
    /// propagated, so one bad unit never takes down its siblings.
    pub async fn run_units<T, F>(
        &self,
        units: Vec<(DeviceName, F)>,
    ) -> Vec<(DeviceName, Result<T>)>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles: Vec<(DeviceName, JoinHandle<Result<T>>)> =
            Vec::with_capacity(units.len());
        for (device, unit) in units {
            let permits = Arc::clone(&self.permits);
            let task_device = device.clone();
            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| {
                    FabgenError::Worker {
                        device: task_device.clone(),
                        message: e.to_string(),
                    }
                })?;
                match tokio::task::spawn_blocking(unit).await {
                    Ok(result) => result,
                    Err(join_err) => Err(FabgenError::Worker {
                        device: task_device,
                        message: join_err.to_string(),
                    }),
                }
            });
            handles.push((device, handle));
        }

        // Cooperative drain: every dispatched unit is awaited, even after a
        // failure has already been observed.
        let mut results = Vec::with_capacity(handles.len());
        for (device, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(FabgenError::Worker {
                    device: device.clone(),
                    message: join_err.to_string(),
                }),
            };
            results.push((device, result));
        }
        results
    }
}
