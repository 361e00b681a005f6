//! Provisioning many environments at once

use super::lifecycle::ProvisionedEnvironment;
use crate::errors::ProvisionError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Outcome of provisioning one environment
#[derive(Debug)]
pub struct ProvisionReport {
    /// The environment, in its final state
    pub environment: ProvisionedEnvironment,
    /// Result of [`ProvisionedEnvironment::create`]
    pub result: Result<(), ProvisionError>,
    /// Time spent provisioning
    pub duration: Duration,
}

impl ProvisionReport {
    /// Returns true if the environment is ready
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Creates every environment using up to `parallelism` worker threads.
///
/// A failing environment does not stop the others. Reports are returned in
/// input order.
#[must_use]
pub fn provision_all(
    environments: Vec<ProvisionedEnvironment>,
    parallelism: usize,
) -> Vec<ProvisionReport> {
    let total = environments.len();
    let workers = parallelism.clamp(1, total.max(1));
    tracing::info!(environments = total, workers, "Provisioning environments");

    let queue = Mutex::new(environments.into_iter().enumerate().collect::<VecDeque<_>>());
    let done = Mutex::new(Vec::with_capacity(total));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let next = queue.lock().pop_front();
                    let Some((index, mut environment)) = next else {
                        break;
                    };

                    let start = Instant::now();
                    let result = environment.create();
                    let duration = start.elapsed();
                    if let Err(e) = &result {
                        tracing::warn!(env = %environment.name(), error = %e, "Provisioning failed");
                    }

                    done.lock().push((
                        index,
                        ProvisionReport {
                            environment,
                            result,
                            duration,
                        },
                    ));
                }
            });
        }
    });

    let mut done = done.into_inner();
    done.sort_by_key(|(index, _)| *index);
    let reports: Vec<ProvisionReport> = done.into_iter().map(|(_, report)| report).collect();

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    tracing::info!(succeeded = total - failed, failed, "Provisioning finished");
    reports
}
