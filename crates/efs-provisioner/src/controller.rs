//! Provisioning controller loop.
//!
//! Lists declared filesystems on a fixed interval and provisions every one
//! that has not been reported `Ready` yet. Requests run one after another;
//! each may be time-boxed, in which case its poll loops are cancelled when
//! the timeout fires.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use efs_core::{DynStore, EfsError, FilesystemSpec, ObjectMeta};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::provisioner::{ProvisionedVolume, Provisioner};

/// Controller interval used when none is configured.
pub const DEFAULT_PROVISIONING_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of one controller pass.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub provisioned: Vec<(ObjectMeta, ProvisionedVolume)>,
    /// Resources already reported `Ready`.
    pub skipped: Vec<ObjectMeta>,
    pub invalid: Vec<ObjectMeta>,
    pub failed: Vec<(ObjectMeta, EfsError)>,
}

/// Drives declared filesystems through [`Provisioner::provision`].
pub struct ProvisioningController {
    store: DynStore,
    provisioner: Arc<Provisioner>,
    request_timeout: Option<Duration>,
}

impl ProvisioningController {
    pub fn new(store: DynStore, provisioner: Arc<Provisioner>) -> Self {
        Self {
            store,
            provisioner,
            request_timeout: None,
        }
    }

    /// Bounds each provisioning request. `None` lets a request poll until
    /// the controller is cancelled.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Runs a provisioning pass every `period` until `cancel` fires.
    ///
    /// The first pass runs immediately. A zero `period` falls back to
    /// [`DEFAULT_PROVISIONING_INTERVAL`].
    pub async fn run(&self, period: Duration, cancel: CancellationToken) {
        let period = if period.is_zero() {
            warn!("Zero provisioning interval, using the default");
            DEFAULT_PROVISIONING_INTERVAL
        } else {
            period
        };
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_secs = period.as_secs(), "Provisioning controller started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.reconcile_once(&cancel).await {
                Ok(report) => info!(
                    provisioned = report.provisioned.len(),
                    skipped = report.skipped.len(),
                    invalid = report.invalid.len(),
                    failed = report.failed.len(),
                    "Provisioning pass completed"
                ),
                Err(e) => error!(error = %e, "Failed to load declared filesystems"),
            }
        }

        info!("Provisioning controller stopped");
    }

    /// Provisions every declared filesystem not yet `Ready`.
    ///
    /// # Errors
    ///
    /// Only a failure to list declared resources is returned.
    pub async fn reconcile_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ProvisionReport, EfsError> {
        let declared = self.store.list_declared().await?;
        let mut report = ProvisionReport::default();

        for resource in declared {
            if cancel.is_cancelled() {
                break;
            }

            let metadata = resource.metadata.clone();
            if resource.is_ready() {
                report.skipped.push(metadata);
                continue;
            }

            let spec = match resource.with_defaults().to_filesystem_spec() {
                Ok(spec) => spec,
                Err(e) => {
                    error!(object = %metadata, error = %e, "Not a valid filesystem object");
                    report.invalid.push(metadata);
                    continue;
                }
            };

            let request = cancel.child_token();
            match self.provision_with_timeout(&spec, &request).await {
                Ok(volume) => {
                    info!(
                        object = %metadata,
                        filesystem_id = %volume.filesystem_id,
                        "Filesystem provisioned"
                    );
                    report.provisioned.push((metadata, volume));
                }
                Err(e) => {
                    error!(object = %metadata, error = %e, "Failed to provision filesystem");
                    report.failed.push((metadata, e));
                }
            }
        }

        Ok(report)
    }

    async fn provision_with_timeout(
        &self,
        spec: &FilesystemSpec,
        request: &CancellationToken,
    ) -> Result<ProvisionedVolume, EfsError> {
        let mut work = pin!(self.provisioner.provision(spec, request));

        let Some(timeout) = self.request_timeout else {
            return work.await;
        };

        tokio::select! {
            result = &mut work => return result,
            _ = tokio::time::sleep(timeout) => {
                warn!(
                    filesystem = %spec.name,
                    timeout_secs = timeout.as_secs(),
                    "Provisioning request timed out, cancelling"
                );
                request.cancel();
            }
        }

        // The cancelled request still has to unwind its mount tasks.
        match work.await {
            Err(e) if e.is_cancelled() => Err(EfsError::cancelled(format!(
                "{} after {}s",
                spec.name,
                timeout.as_secs()
            ))),
            other => other,
        }
    }
}
