//! Non-blocking inspection of the cluster buffer

use super::layout::{ClusterLayout, ClusterSnapshot};
use crate::backend::{BackendError, BackendResult, GraphicsBackend, PendingReadback};
use std::fmt;

const MAX_WAIT_POLLS: u32 = 64;

/// An in-flight copy of the first cluster records
#[derive(Debug)]
pub struct ClusterReadback {
    pending: PendingReadback,
    layout: ClusterLayout,
    count: u32,
}

impl ClusterReadback {
    pub(crate) fn new(pending: PendingReadback, layout: ClusterLayout, count: u32) -> Self {
        Self {
            pending,
            layout,
            count,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.pending.is_ready()
    }

    /// Decoded records once the copy has landed, `None` while it is in
    /// flight. The result can be taken only once.
    pub fn try_snapshots(&mut self) -> Option<BackendResult<Vec<ClusterSnapshot>>> {
        let result = self.pending.try_take()?;
        Some(result.map(|bytes| self.layout.decode_all(&bytes, self.count)))
    }

    /// Block until the copy lands. Meant for tools and tests, never for the
    /// frame loop.
    pub fn wait(mut self, backend: &mut dyn GraphicsBackend) -> BackendResult<Vec<ClusterSnapshot>> {
        for _ in 0..MAX_WAIT_POLLS {
            if let Some(result) = self.try_snapshots() {
                return result;
            }
            backend.poll(true);
        }
        Err(BackendError::ReadbackFailed(format!(
            "cluster readback did not complete after {} polls",
            MAX_WAIT_POLLS
        )))
    }
}

/// Aggregate view of a set of snapshots, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterSummary {
    pub clusters: u32,
    pub non_empty: u32,
    pub max_count: u32,
    /// Clusters that hit the per-cluster capacity
    pub saturated: u32,
    pub total_indices: u64,
}

impl ClusterSummary {
    pub fn from_snapshots(snapshots: &[ClusterSnapshot], max_lights_per_cluster: u32) -> Self {
        snapshots.iter().fold(Self::default(), |mut summary, snapshot| {
            summary.clusters += 1;
            summary.non_empty += u32::from(snapshot.count > 0);
            summary.saturated += u32::from(snapshot.count >= max_lights_per_cluster);
            summary.max_count = summary.max_count.max(snapshot.count);
            summary.total_indices += snapshot.count as u64;
            summary
        })
    }

    pub fn average_count(&self) -> f32 {
        if self.clusters == 0 {
            0.0
        } else {
            self.total_indices as f32 / self.clusters as f32
        }
    }
}

impl fmt::Display for ClusterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} clusters, {} non-empty, avg {:.2} lights, max {}, {} saturated",
            self.clusters,
            self.non_empty,
            self.average_count(),
            self.max_count,
            self.saturated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Aabb;
    use glam::Vec3;

    fn snapshot(index: u32, count: u32) -> ClusterSnapshot {
        ClusterSnapshot {
            index,
            count,
            aabb: Aabb::new(Vec3::ZERO, Vec3::ONE),
            indices: (0..count).collect(),
        }
    }

    #[test]
    fn test_try_snapshots_before_and_after_completion() {
        let layout = ClusterLayout::new(2, 4);
        let pending = PendingReadback::new();
        let mut readback = ClusterReadback::new(pending.clone(), layout, 2);
        assert!(readback.try_snapshots().is_none());

        let mut bytes = vec![0u8; layout.buffer_size() as usize];
        layout.encode(&mut bytes, 1, &Aabb::new(Vec3::ZERO, Vec3::ONE), &[3, 1]);
        pending.complete(Ok(bytes));

        let snapshots = readback.try_snapshots().unwrap().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].indices, vec![3, 1]);
        assert!(readback.try_snapshots().is_none());
    }

    #[test]
    fn test_failed_readback_is_reported() {
        let pending = PendingReadback::new();
        let mut readback = ClusterReadback::new(pending.clone(), ClusterLayout::new(1, 1), 1);
        pending.complete(Err(BackendError::ReadbackFailed("lost".into())));
        assert!(matches!(
            readback.try_snapshots(),
            Some(Err(BackendError::ReadbackFailed(_)))
        ));
    }

    #[test]
    fn test_summary() {
        let summary =
            ClusterSummary::from_snapshots(&[snapshot(0, 0), snapshot(1, 4), snapshot(2, 2)], 4);
        assert_eq!(summary.clusters, 3);
        assert_eq!(summary.non_empty, 2);
        assert_eq!(summary.saturated, 1);
        assert_eq!(summary.max_count, 4);
        assert_eq!(summary.total_indices, 6);
        assert!((summary.average_count() - 2.0).abs() < 1e-6);
        assert!(summary.to_string().contains("1 saturated"));
    }
}
