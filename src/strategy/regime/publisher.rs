//! Threshold Publisher
//!
//! Single-writer handle over a `watch` channel of `Arc<ThresholdSet>`.
//! Readers clone the `Arc` and never observe a partially updated set.

use std::sync::Arc;
use tokio::sync::watch;

use crate::strategy::params::ThresholdSet;

#[derive(Debug)]
pub struct ThresholdPublisher {
    tx: watch::Sender<Arc<ThresholdSet>>,
}

impl ThresholdPublisher {
    pub fn new(initial: ThresholdSet) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ThresholdSet>> {
        self.tx.subscribe()
    }

    /// Replace the published set; succeeds with or without live readers
    pub fn publish(&self, set: ThresholdSet) -> Arc<ThresholdSet> {
        let set = Arc::new(set);
        self.tx.send_replace(Arc::clone(&set));
        set
    }

    pub fn current(&self) -> Arc<ThresholdSet> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::params::{Profile, ValidationConfig};

    #[test]
    fn test_publish_replaces_whole_set() {
        let base = ThresholdSet::base(&Profile::default(), &ValidationConfig::default());
        let publisher = ThresholdPublisher::new(base.clone());
        let rx = publisher.subscribe();
        let held = rx.borrow().clone();

        let mut next = base;
        next.version = 1;
        next.std_threshold = 2.0;
        publisher.publish(next);

        // Previously cloned snapshot is untouched
        assert_eq!(held.version, 0);
        assert_eq!(held.std_threshold, 1.5);
        assert_eq!(rx.borrow().version, 1);
        assert_eq!(publisher.current().std_threshold, 2.0);
    }

    #[test]
    fn test_publish_without_readers() {
        let base = ThresholdSet::base(&Profile::aggressive(), &ValidationConfig::default());
        let publisher = ThresholdPublisher::new(base.clone());
        let mut next = base;
        next.version = 5;
        publisher.publish(next);
        assert_eq!(publisher.version(), 5);
    }
}
