//! Delivery point, depot, priority, and time window types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle (haversine) distance to another coordinate, in meters.
    pub fn haversine_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// Delivery priority, restricted to `0..=3`.
///
/// # Examples
///
/// ```
/// use u_cluster::models::Priority;
///
/// let p = Priority::new(2).unwrap();
/// assert_eq!(p.value(), 2);
/// assert!(Priority::new(4).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Highest accepted priority value.
    pub const MAX: u8 = 3;

    /// Creates a priority, rejecting values above [`Priority::MAX`].
    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(ClusterError::InvalidPriority(value));
        }
        Ok(Self(value))
    }

    /// Numeric priority value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Priority {
    type Error = ClusterError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.0
    }
}

/// An opening/closing window for delivery at a point.
///
/// Times are expressed in the caller's unit (typically minutes from the
/// start of the working day).
///
/// # Examples
///
/// ```
/// use u_cluster::models::TimeWindow;
///
/// let tw = TimeWindow::new(480.0, 720.0).unwrap();
/// assert!(tw.contains(600.0));
/// assert!(TimeWindow::new(720.0, 480.0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    opening: f64,
    closing: f64,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// Returns `None` if `opening > closing` or either value is non-finite.
    pub fn new(opening: f64, closing: f64) -> Option<Self> {
        if !opening.is_finite() || !closing.is_finite() || opening > closing {
            return None;
        }
        Some(Self { opening, closing })
    }

    /// Earliest delivery time.
    pub fn opening(&self) -> f64 {
        self.opening
    }

    /// Latest delivery time.
    pub fn closing(&self) -> f64 {
        self.closing
    }

    /// Returns `true` if the given time falls within this window.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.opening && time <= self.closing
    }
}

/// A delivery point to be clustered.
///
/// `index` is the point's stable position in its collection; every matrix
/// built for a run is indexed by it. The cluster id is written only by
/// [`assemble`](crate::assembly::assemble).
///
/// # Examples
///
/// ```
/// use u_cluster::models::{Point, Priority};
///
/// let p = Point::new(0, 52.37, 4.89, Priority::new(1).unwrap()).with_package_id("PKG-1");
/// assert_eq!(p.index(), 0);
/// assert_eq!(p.package_id(), Some("PKG-1"));
/// assert!(p.cluster_id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    index: usize,
    package_id: Option<String>,
    coordinate: Coordinate,
    priority: Priority,
    time_window: Option<TimeWindow>,
    cluster_id: Option<usize>,
}

impl Point {
    /// Creates an unassigned point.
    pub fn new(index: usize, latitude: f64, longitude: f64, priority: Priority) -> Self {
        Self {
            index,
            package_id: None,
            coordinate: Coordinate::new(latitude, longitude),
            priority,
            time_window: None,
            cluster_id: None,
        }
    }

    /// Attaches the external package identifier.
    pub fn with_package_id(mut self, id: impl Into<String>) -> Self {
        self.package_id = Some(id.into());
        self
    }

    /// Sets a delivery time window.
    pub fn with_time_window(mut self, tw: TimeWindow) -> Self {
        self.time_window = Some(tw);
        self
    }

    /// Position of this point in the input collection.
    pub fn index(&self) -> usize {
        self.index
    }

    /// External package identifier, if set.
    pub fn package_id(&self) -> Option<&str> {
        self.package_id.as_deref()
    }

    /// Location of the point.
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }

    /// Delivery priority in `0..=3`.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Delivery time window, if any.
    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    /// Cluster assigned by the most recent run, `None` before the first run.
    pub fn cluster_id(&self) -> Option<usize> {
        self.cluster_id
    }

    pub(crate) fn set_cluster_id(&mut self, cluster_id: usize) {
        self.cluster_id = Some(cluster_id);
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Point #{} ({}) lat={} lon={} priority={}",
            self.index,
            self.package_id.as_deref().unwrap_or("-"),
            self.coordinate.latitude,
            self.coordinate.longitude,
            self.priority.value()
        )?;
        if let Some(tw) = &self.time_window {
            write!(f, " window=[{}, {}]", tw.opening, tw.closing)?;
        }
        match self.cluster_id {
            Some(c) => write!(f, " cluster={c}"),
            None => write!(f, " cluster=unassigned"),
        }
    }
}

/// The shared start and end location of every route in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Depot {
    id: String,
    coordinate: Coordinate,
}

impl Depot {
    /// Creates a depot.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            coordinate: Coordinate::new(latitude, longitude),
        }
    }

    /// Depot identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Location of the depot.
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }
}
