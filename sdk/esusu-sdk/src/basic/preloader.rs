use crate::advanced::calldata::Felt;
use crate::advanced::calls;
use crate::core::connection::StarkConnection;
use crate::error::EsusuSdkError;
use crate::types::{AmountFormat, GroupId};
use crate::utils;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};

const TARGET: &str = "esusu_sdk::preloader";

/// Outcome of one warm-up batch. Purely informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Existing groups whose record is now cached
    pub warmed: Vec<GroupId>,
    /// Sentinel or undecodable records
    pub missing: Vec<GroupId>,
    pub failed: Vec<GroupId>,
}

/// Best-effort warm-up of the first `count` group records.
///
/// Results flow into whatever cache `connection` keeps (see
/// [`crate::core::cache::CachingConnection`]); nothing depends on it having run.
pub struct Preloader<C> {
    connection: Arc<C>,
    contract: Felt,
    count: u64,
    delay: Duration,
    format: AmountFormat,
}

impl<C: StarkConnection + 'static> Preloader<C> {
    pub fn new(
        connection: Arc<C>,
        contract: Felt,
        count: u64,
        delay: Duration,
        format: AmountFormat,
    ) -> Self {
        Self {
            connection,
            contract,
            count,
            delay,
            format,
        }
    }

    /// Wait out the start-up delay, then look up ids `1..=count` in parallel.
    /// A failing lookup is logged and skipped; it never aborts the batch.
    pub async fn run(&self) -> PreloadReport {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut lookups = JoinSet::new();
        for id in 1..=self.count {
            let group_id = GroupId::from(id);
            let connection = Arc::clone(&self.connection);
            let call = calls::get_group_info(self.contract, group_id);
            lookups.spawn(async move {
                let response = connection.call(&call).await;
                (group_id, call, response)
            });
        }

        let mut report = PreloadReport::default();
        while let Some(joined) = lookups.join_next().await {
            let (group_id, call, response) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(target: TARGET, "preload task aborted: {}", e);
                    continue;
                },
            };

            match response {
                Ok(value) => match utils::normalize_group_info(&value, self.format) {
                    Some(info) if !info.is_nonexistent() => report.warmed.push(group_id),
                    _ => {
                        // the group may be created before the entry would expire
                        self.connection.invalidate(&call).await;
                        report.missing.push(group_id);
                    },
                },
                Err(e) => {
                    warn!(
                        target: TARGET,
                        "preload of group {} failed: {}",
                        group_id,
                        EsusuSdkError::classify(e)
                    );
                    report.failed.push(group_id);
                },
            }
        }

        report.warmed.sort();
        report.missing.sort();
        report.failed.sort();

        info!(
            target: TARGET,
            "preloaded {} groups ({} missing, {} failed)",
            report.warmed.len(),
            report.missing.len(),
            report.failed.len()
        );
        debug!(target: TARGET, "preload report: {:?}", report);
        report
    }

    /// Run in the background.
    pub fn spawn(self) -> JoinHandle<PreloadReport> {
        tokio::spawn(async move { self.run().await })
    }
}
