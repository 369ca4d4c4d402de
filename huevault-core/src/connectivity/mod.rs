//! Network reachability tracking.
//!
//! A [`ConnectivityMonitor`] polls a [`ReachabilityProbe`] on a background
//! task and emits a [`ConnectivityEvent`] only when the state changes.

mod monitor;
mod probe;
mod tracker;

pub use monitor::{ConnectivityMonitor, DEFAULT_POLL_INTERVAL};
pub use probe::{HttpProbe, ManualProbe, ReachabilityProbe, DEFAULT_PROBE_TIMEOUT};
pub use tracker::ConnectivityTracker;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Offline,
    Online,
}

impl Connectivity {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Offline => write!(f, "offline"),
            Connectivity::Online => write!(f, "online"),
        }
    }
}

/// A change in connectivity. `previous` is `None` for the first observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityEvent {
    pub previous: Option<Connectivity>,
    pub current: Connectivity,
}

impl ConnectivityEvent {
    /// True for an edge into `Online`, including the first observation.
    pub fn came_online(&self) -> bool {
        self.current.is_online() && self.previous != Some(Connectivity::Online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_came_online() {
        let initial = ConnectivityEvent {
            previous: None,
            current: Connectivity::Online,
        };
        let restored = ConnectivityEvent {
            previous: Some(Connectivity::Offline),
            current: Connectivity::Online,
        };
        let lost = ConnectivityEvent {
            previous: Some(Connectivity::Online),
            current: Connectivity::Offline,
        };

        assert!(initial.came_online());
        assert!(restored.came_online());
        assert!(!lost.came_online());
    }

    #[test]
    fn test_display() {
        assert_eq!(Connectivity::Online.to_string(), "online");
        assert_eq!(Connectivity::Offline.to_string(), "offline");
    }
}
