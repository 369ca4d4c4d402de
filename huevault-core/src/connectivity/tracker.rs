use super::{Connectivity, ConnectivityEvent};

/// Turns a stream of reachability samples into transition events.
///
/// Repeated samples of the same state produce nothing; the first sample
/// always produces an event since there is no assumed starting state.
#[derive(Debug, Default)]
pub struct ConnectivityTracker {
    state: Option<Connectivity>,
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<Connectivity> {
        self.state
    }

    pub fn observe(&mut self, reachable: bool) -> Option<ConnectivityEvent> {
        let current = Connectivity::from_reachable(reachable);
        if self.state == Some(current) {
            return None;
        }

        let previous = self.state.replace(current);
        Some(ConnectivityEvent { previous, current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_an_event() {
        let mut tracker = ConnectivityTracker::new();
        assert_eq!(tracker.state(), None);

        let event = tracker.observe(false).unwrap();
        assert_eq!(event.previous, None);
        assert_eq!(event.current, Connectivity::Offline);
        assert_eq!(tracker.state(), Some(Connectivity::Offline));
    }

    #[test]
    fn test_only_edges_emit() {
        let mut tracker = ConnectivityTracker::new();
        let samples = [false, false, true, true, true, false, true];

        let events: Vec<ConnectivityEvent> =
            samples.iter().filter_map(|s| tracker.observe(*s)).collect();

        let states: Vec<Connectivity> = events.iter().map(|e| e.current).collect();
        assert_eq!(
            states,
            vec![
                Connectivity::Offline,
                Connectivity::Online,
                Connectivity::Offline,
                Connectivity::Online
            ]
        );
        assert_eq!(events.iter().filter(|e| e.came_online()).count(), 2);
    }
}
