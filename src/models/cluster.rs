//! Depot-anchored cluster aggregates.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{Coordinate, Depot, Point, Priority};

/// One stop in a cluster's closed-loop waypoint sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waypoint<'a> {
    Depot(&'a Depot),
    Delivery(&'a Point),
}

impl Waypoint<'_> {
    /// Location of this stop.
    pub fn coordinate(&self) -> Coordinate {
        match self {
            Waypoint::Depot(d) => d.coordinate(),
            Waypoint::Delivery(p) => p.coordinate(),
        }
    }

    /// Returns `true` for the depot stops at either end of the sequence.
    pub fn is_depot(&self) -> bool {
        matches!(self, Waypoint::Depot(_))
    }

    /// Serializable stop for a route-optimization request.
    pub fn to_stop(&self) -> Stop {
        match self {
            Waypoint::Depot(d) => Stop {
                point: d.coordinate(),
                priority: None,
                time_window: None,
            },
            Waypoint::Delivery(p) => Stop {
                point: p.coordinate(),
                priority: (p.priority().value() != 0).then(|| p.priority().value()),
                time_window: p.time_window().map(|tw| {
                    vec![StopWindow {
                        opening_hour: tw.opening(),
                        closing_hour: tw.closing(),
                    }]
                }),
            },
        }
    }
}

/// Stop entry sent to a route-optimization consumer.
///
/// Priority is omitted when zero and the time window when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub point: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<Vec<StopWindow>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StopWindow {
    pub opening_hour: f64,
    pub closing_hour: f64,
}

/// Per-priority member counts of a cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityCounts([usize; Priority::MAX as usize + 1]);

impl PriorityCounts {
    /// Number of members with the given priority.
    pub fn get(&self, priority: Priority) -> usize {
        self.0[priority.value() as usize]
    }

    /// Counts indexed by priority value.
    pub fn as_array(&self) -> &[usize; Priority::MAX as usize + 1] {
        &self.0
    }

    /// Sum over all buckets, equal to the member count.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

/// A group of delivery points served from the run's depot.
///
/// Member order is the candidate visiting order. Clusters are produced by
/// [`assemble`](crate::assembly::assemble) and never modified afterwards.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use u_cluster::models::{Cluster, Depot, Point, Priority};
///
/// let depot = Arc::new(Depot::new("WH", 0.0, 0.0));
/// let members = vec![Point::new(0, 1.0, 1.0, Priority::default())];
/// let cluster = Cluster::new(0, members, depot);
///
/// let stops = cluster.waypoints();
/// assert_eq!(stops.len(), 3);
/// assert!(stops[0].is_depot() && stops[2].is_depot());
/// ```
#[derive(Debug, Clone)]
pub struct Cluster {
    id: usize,
    members: Vec<Point>,
    depot: Arc<Depot>,
}

impl Cluster {
    /// Creates a cluster from its members in visiting order.
    pub fn new(id: usize, members: Vec<Point>, depot: Arc<Depot>) -> Self {
        Self { id, members, depot }
    }

    /// Cluster id, equal to the label written into each member.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Members in candidate visiting order.
    pub fn members(&self) -> &[Point] {
        &self.members
    }

    /// Shared depot of the run that produced this cluster.
    pub fn depot(&self) -> &Arc<Depot> {
        &self.depot
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no point was assigned here.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Input indices of the members, in visiting order.
    pub fn member_indices(&self) -> Vec<usize> {
        self.members.iter().map(|p| p.index()).collect()
    }

    /// Closed-loop stop sequence: depot, members, depot.
    pub fn waypoints(&self) -> Vec<Waypoint<'_>> {
        let mut stops = Vec::with_capacity(self.members.len() + 2);
        stops.push(Waypoint::Depot(&self.depot));
        stops.extend(self.members.iter().map(Waypoint::Delivery));
        stops.push(Waypoint::Depot(&self.depot));
        stops
    }

    /// Waypoint sequence in the outbound request format.
    pub fn stops(&self) -> Vec<Stop> {
        self.waypoints().iter().map(Waypoint::to_stop).collect()
    }

    /// Counts members per priority bucket.
    pub fn priority_counts(&self) -> PriorityCounts {
        let mut counts = PriorityCounts::default();
        for p in &self.members {
            counts.0[p.priority().value() as usize] += 1;
        }
        counts
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cluster {}", self.id)?;
        for p in &self.members {
            writeln!(f, "{p}")?;
        }
        Ok(())
    }
}
