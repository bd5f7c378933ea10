//! Label application: turns a partition into depot-anchored clusters.

use std::sync::Arc;

use crate::clustering::Partition;
use crate::error::{ClusterError, Result};
use crate::models::{Cluster, Depot, Point};

/// Groups `points` by label and records each point's cluster id.
///
/// Members keep their input order inside a cluster; that order is the
/// candidate visiting sequence. Exactly `partition.num_clusters()` clusters
/// are returned, all sharing `depot`.
///
/// The partition is checked against `points` before any point is touched,
/// so an error leaves every cluster id as it was.
///
/// # Errors
///
/// [`ClusterError::InvalidLabels`] if the label count differs from the
/// point count or a label is out of range.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use u_cluster::assembly::assemble;
/// use u_cluster::clustering::Partition;
/// use u_cluster::models::{Depot, Point, Priority};
///
/// let mut points: Vec<Point> = (0..3)
///     .map(|i| Point::new(i, 0.0, i as f64, Priority::default()))
///     .collect();
/// let partition = Partition::from_labels(vec![1, 0, 1], 2).unwrap();
/// let clusters = assemble(&mut points, &partition, Arc::new(Depot::new("WH", 0.0, 0.0))).unwrap();
///
/// assert_eq!(clusters[1].member_indices(), vec![0, 2]);
/// assert_eq!(points[1].cluster_id(), Some(0));
/// ```
pub fn assemble(points: &mut [Point], partition: &Partition, depot: Arc<Depot>) -> Result<Vec<Cluster>> {
    let labels = partition.labels();
    let k = partition.num_clusters();
    if labels.len() != points.len() {
        return Err(ClusterError::InvalidLabels(format!(
            "{} labels for {} points",
            labels.len(),
            points.len()
        )));
    }
    if let Some((i, &l)) = labels.iter().enumerate().find(|&(_, &l)| l >= k) {
        return Err(ClusterError::InvalidLabels(format!(
            "point {i} has label {l}, expected below {k}"
        )));
    }

    let mut groups: Vec<Vec<Point>> = vec![Vec::new(); k];
    for (point, &label) in points.iter_mut().zip(labels) {
        point.set_cluster_id(label);
        groups[label].push(point.clone());
    }

    Ok(groups
        .into_iter()
        .enumerate()
        .map(|(id, members)| Cluster::new(id, members, Arc::clone(&depot)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use proptest::prelude::*;

    fn points(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(i, 50.0, i as f64 * 0.1, Priority::default()))
            .collect()
    }

    fn depot() -> Arc<Depot> {
        Arc::new(Depot::new("WH", 50.0, 0.0))
    }

    #[test]
    fn test_groups_preserve_input_order() {
        let mut pts = points(5);
        let partition = Partition::from_labels(vec![1, 0, 1, 0, 1], 2).expect("valid");
        let clusters = assemble(&mut pts, &partition, depot()).expect("valid");

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].id(), 0);
        assert_eq!(clusters[0].member_indices(), vec![1, 3]);
        assert_eq!(clusters[1].member_indices(), vec![0, 2, 4]);
        let ids: Vec<_> = pts.iter().map(Point::cluster_id).collect();
        assert_eq!(ids, vec![Some(1), Some(0), Some(1), Some(0), Some(1)]);
        // Members carry the freshly written id.
        assert_eq!(clusters[1].members()[0].cluster_id(), Some(1));
    }

    #[test]
    fn test_clusters_share_one_depot() {
        let mut pts = points(4);
        let d = depot();
        let partition = Partition::from_labels(vec![0, 1, 2, 0], 3).expect("valid");
        let clusters = assemble(&mut pts, &partition, Arc::clone(&d)).expect("valid");
        assert!(clusters.iter().all(|c| Arc::ptr_eq(c.depot(), &d)));
        assert_eq!(Arc::strong_count(&d), 4);
    }

    #[test]
    fn test_rejects_mismatched_labels_without_mutation() {
        let mut pts = points(3);
        let short = Partition::from_labels(vec![0, 0], 1).expect("valid");
        assert!(matches!(
            assemble(&mut pts, &short, depot()),
            Err(ClusterError::InvalidLabels(_))
        ));
        assert!(pts.iter().all(|p| p.cluster_id().is_none()));
    }

    #[test]
    fn test_empty_input_yields_empty_clusters() {
        let mut pts = Vec::new();
        let partition = Partition::from_labels(Vec::new(), 3).expect("valid");
        let clusters = assemble(&mut pts, &partition, depot()).expect("valid");
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(Cluster::is_empty));
        assert_eq!(clusters[2].waypoints().len(), 2);
    }

    #[test]
    fn test_rerun_overwrites_ids() {
        let mut pts = points(3);
        let first = Partition::from_labels(vec![0, 0, 1], 2).expect("valid");
        assemble(&mut pts, &first, depot()).expect("valid");
        let second = Partition::from_labels(vec![0, 0, 0], 1).expect("valid");
        let clusters = assemble(&mut pts, &second, depot()).expect("valid");
        assert_eq!(clusters.len(), 1);
        assert!(pts.iter().all(|p| p.cluster_id() == Some(0)));
    }

    proptest! {
        #[test]
        fn prop_clusters_partition_points(
            (k, labels) in (1usize..6).prop_flat_map(|k| {
                (Just(k), prop::collection::vec(0..k, k..40))
            })
        ) {
            let mut pts = points(labels.len());
            let partition = Partition::from_labels(labels.clone(), k).expect("valid");
            let clusters = assemble(&mut pts, &partition, depot()).expect("valid");

            prop_assert_eq!(clusters.len(), k);
            let mut seen: Vec<usize> = clusters.iter().flat_map(Cluster::member_indices).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..labels.len()).collect::<Vec<_>>());
            for c in &clusters {
                prop_assert_eq!(c.waypoints().len(), c.len() + 2);
            }
        }
    }
}
