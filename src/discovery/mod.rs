// Aggregator: drives every registered probe and assembles one snapshot.

mod store;

pub use store::SnapshotStore;

use crate::models::{ProbeStatus, Section, Snapshot, SnapshotMeta};
use crate::probe::inspector::SystemInspector;
use crate::probe::registry::ProbeRegistry;
use crate::probe::{ProbeDomain, ProbeOutcome, ProbeSpec};
use crate::version::SCHEMA_VERSION;
use futures_util::StreamExt;
use futures_util::stream;
use std::sync::Arc;
use tokio::time::Instant;

/// Runs one probe and pairs its outcome with the spec. Kept as a free
/// function so lifetime elision ties the returned future's borrow to the
/// input, which the inline closure form cannot express for `buffered`.
fn run_one(spec: &ProbeSpec) -> impl std::future::Future<Output = (&ProbeSpec, ProbeOutcome)> {
    async move { (spec, spec.run().await) }
}

pub struct Aggregator {
    registry: Arc<ProbeRegistry>,
    inspector: Arc<SystemInspector>,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(
        registry: Arc<ProbeRegistry>,
        inspector: Arc<SystemInspector>,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            inspector,
            concurrency: concurrency.max(1),
        }
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// Runs every probe and assembles the snapshot in registry order.
    /// Cannot fail: a run where every probe is unavailable is still a
    /// complete snapshot.
    pub async fn run_all(&self) -> Snapshot {
        let started = Instant::now();

        // buffered() bounds concurrency and yields in input order, so
        // assembly order is registry order regardless of completion order.
        let results: Vec<_> = stream::iter(self.registry.probes())
            .map(run_one)
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut hardware = Section::new();
        let mut peripherals = Section::new();
        let mut software = Section::new();
        let mut network = Section::new();
        let mut unavailable = 0usize;
        let mut timed_out = 0usize;

        for (spec, outcome) in results {
            let report = outcome.into_report(spec.budget);
            match report.status {
                ProbeStatus::Ok => {}
                ProbeStatus::Unavailable => unavailable += 1,
                ProbeStatus::TimedOut => timed_out += 1,
            }
            if let Some(reason) = &report.error {
                tracing::debug!(
                    domain = spec.domain.as_str(),
                    probe = spec.name,
                    reason = %reason,
                    "probe did not produce a value"
                );
            }
            let section = match spec.domain {
                ProbeDomain::Hardware => &mut hardware,
                ProbeDomain::Peripherals => &mut peripherals,
                ProbeDomain::Software => &mut software,
                ProbeDomain::Network => &mut network,
            };
            section.insert(
                spec.name.to_string(),
                serde_json::to_value(report).unwrap_or(serde_json::Value::Null),
            );
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            probes = self.registry.len(),
            unavailable,
            timed_out,
            elapsed_ms,
            "discovery run complete"
        );

        Snapshot {
            meta: SnapshotMeta {
                discovery_timestamp: chrono::Local::now().to_rfc3339(),
                schema_version: SCHEMA_VERSION.to_string(),
                hostname: self.inspector.hostname(),
                elapsed_ms,
            },
            hardware,
            peripherals,
            software,
            network,
        }
    }
}
