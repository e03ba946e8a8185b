//! Label lifecycle tracking.
//!
//! Upstream hardware comes and goes: a fan is unplugged, a probe is swapped,
//! a controller is removed from the account. A gauge vector never forgets a
//! label set on its own, so without intervention those series would keep
//! exporting their last value forever.
//!
//! [`LabelTracker`] remembers, per [`MetricFamily`], which label tuples were
//! live after the last successful poll. Each new poll's observations are
//! diffed against that set and exactly the vanished tuples are evicted from
//! every gauge of the family.
//!
//! The tracked sets only change inside [`LabelTracker::reconcile`], so a poll
//! that fails before reconciling leaves the previous state authoritative.

use super::labels::{LabelTuple, MetricFamily};
use std::collections::HashSet;

/// Something that can drop every series of a family for one label tuple.
///
/// Removing a series that does not exist must be a silent no-op.
pub trait SeriesSink {
    fn remove_series(&self, family: MetricFamily, labels: &LabelTuple);
}

/// Label tuples observed during a single poll, grouped by family.
#[derive(Debug, Clone, Default)]
pub struct ObservedSeries {
    sets: [HashSet<LabelTuple>; MetricFamily::COUNT],
}

impl ObservedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `labels` as live in `family`. Returns false if already present.
    pub fn insert(&mut self, family: MetricFamily, labels: LabelTuple) -> bool {
        self.sets[family.index()].insert(labels)
    }

    pub fn get(&self, family: MetricFamily) -> &HashSet<LabelTuple> {
        &self.sets[family.index()]
    }

    pub fn count(&self, family: MetricFamily) -> usize {
        self.sets[family.index()].len()
    }
}

/// Per-family tuples evicted by one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct Evictions {
    evicted: [Vec<LabelTuple>; MetricFamily::COUNT],
}

impl Evictions {
    pub fn get(&self, family: MetricFamily) -> &[LabelTuple] {
        &self.evicted[family.index()]
    }

    pub fn total(&self) -> usize {
        self.evicted.iter().map(Vec::len).sum()
    }
}

/// Live label tuples per family as of the last successful poll.
#[derive(Debug, Clone, Default)]
pub struct LabelTracker {
    tracked: [HashSet<LabelTuple>; MetricFamily::COUNT],
}

impl LabelTracker {
    /// Creates a tracker with every family empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tuples currently considered live for `family`.
    pub fn tracked(&self, family: MetricFamily) -> &HashSet<LabelTuple> {
        &self.tracked[family.index()]
    }

    /// Evicts tuples of `family` that are absent from `current`, then adopts
    /// `current` as the tracked set. Returns the evicted tuples.
    pub fn reconcile<S>(
        &mut self,
        family: MetricFamily,
        current: HashSet<LabelTuple>,
        sink: &S,
    ) -> Vec<LabelTuple>
    where
        S: SeriesSink + ?Sized,
    {
        let previous = &mut self.tracked[family.index()];
        let stale: Vec<LabelTuple> = previous.difference(&current).cloned().collect();

        for labels in &stale {
            sink.remove_series(family, labels);
        }
        if !stale.is_empty() {
            tracing::debug!(family = %family, evicted = stale.len(), "Evicted stale series");
        }

        *previous = current;
        stale
    }

    /// Reconciles every family against one poll's observations.
    pub fn reconcile_all<S>(&mut self, observed: ObservedSeries, sink: &S) -> Evictions
    where
        S: SeriesSink + ?Sized,
    {
        let mut evictions = Evictions::default();
        for (family, current) in MetricFamily::ALL.into_iter().zip(observed.sets) {
            evictions.evicted[family.index()] = self.reconcile(family, current, sink);
        }
        evictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::registry::{read_series, MetricsRegistry};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        removed: RefCell<Vec<(MetricFamily, LabelTuple)>>,
    }

    impl SeriesSink for RecordingSink {
        fn remove_series(&self, family: MetricFamily, labels: &LabelTuple) {
            self.removed.borrow_mut().push((family, labels.clone()));
        }
    }

    fn set_of(tuples: &[LabelTuple]) -> HashSet<LabelTuple> {
        tuples.iter().cloned().collect()
    }

    #[test]
    fn test_starts_empty() {
        let tracker = LabelTracker::new();
        for family in MetricFamily::ALL {
            assert!(tracker.tracked(family).is_empty());
        }
    }

    #[test]
    fn test_vanished_tuple_is_evicted_once() {
        let a = LabelTuple::from(["C1", "1"]);
        let b = LabelTuple::from(["C1", "2"]);
        let sink = RecordingSink::default();
        let mut tracker = LabelTracker::new();

        tracker.reconcile(MetricFamily::SensorCo2, set_of(&[a.clone(), b.clone()]), &sink);
        assert!(sink.removed.borrow().is_empty());

        let evicted = tracker.reconcile(MetricFamily::SensorCo2, set_of(&[a.clone()]), &sink);
        assert_eq!(evicted, vec![b.clone()]);
        assert_eq!(tracker.tracked(MetricFamily::SensorCo2), &set_of(&[a.clone()]));

        // Already gone: nothing more to evict.
        tracker.reconcile(MetricFamily::SensorCo2, set_of(&[a]), &sink);
        assert_eq!(
            sink.removed.borrow().as_slice(),
            &[(MetricFamily::SensorCo2, b)]
        );
    }

    #[test]
    fn test_families_are_independent() {
        let tuple = LabelTuple::from(["C1", "1"]);
        let sink = RecordingSink::default();
        let mut tracker = LabelTracker::new();

        tracker.reconcile(MetricFamily::SensorCo2, set_of(&[tuple.clone()]), &sink);
        tracker.reconcile(MetricFamily::SensorLight, set_of(&[tuple.clone()]), &sink);
        tracker.reconcile(MetricFamily::SensorLight, HashSet::new(), &sink);

        assert!(tracker.tracked(MetricFamily::SensorCo2).contains(&tuple));
        assert!(tracker.tracked(MetricFamily::SensorLight).is_empty());
        assert_eq!(
            sink.removed.borrow().as_slice(),
            &[(MetricFamily::SensorLight, tuple)]
        );
    }

    #[test]
    fn test_reconcile_all_covers_every_family() {
        let sink = RecordingSink::default();
        let mut tracker = LabelTracker::new();

        let mut first = ObservedSeries::new();
        first.insert(MetricFamily::Controller, LabelTuple::from(["C1", "Tent"]));
        first.insert(MetricFamily::Device, LabelTuple::from(["C1", "1", "Fan"]));
        first.insert(MetricFamily::SensorSoil, LabelTuple::from(["C1", "3"]));
        tracker.reconcile_all(first, &sink);

        let mut second = ObservedSeries::new();
        second.insert(MetricFamily::Controller, LabelTuple::from(["C1", "Tent"]));
        let evictions = tracker.reconcile_all(second, &sink);

        assert_eq!(evictions.total(), 2);
        assert_eq!(evictions.get(MetricFamily::Device).len(), 1);
        assert_eq!(evictions.get(MetricFamily::SensorSoil).len(), 1);
        assert_eq!(tracker.tracked(MetricFamily::Controller).len(), 1);
    }

    #[test]
    fn test_eviction_against_real_gauges() {
        let registry = MetricsRegistry::new().unwrap();
        let a = LabelTuple::from(["C1", "1", "probe_temp"]);
        let b = LabelTuple::from(["C1", "2", "probe_temp"]);
        let gauge = &registry.sensor_temperature;
        let mut tracker = LabelTracker::new();

        registry.set(gauge, &a, 21.0).unwrap();
        registry.set(gauge, &b, 22.0).unwrap();
        tracker.reconcile(
            MetricFamily::SensorTemperature,
            set_of(&[a.clone(), b.clone()]),
            &registry,
        );

        registry.set(gauge, &a, 21.5).unwrap();
        tracker.reconcile(MetricFamily::SensorTemperature, set_of(&[a.clone()]), &registry);

        assert_eq!(read_series(gauge, MetricFamily::SensorTemperature, &a), Some(21.5));
        assert_eq!(read_series(gauge, MetricFamily::SensorTemperature, &b), None);
    }
}
