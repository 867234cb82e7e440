//! Fault-injecting source wrapper for outage drills.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use kinder_core::{Collection, Record};

use super::{DataSource, SourceError};

#[derive(Debug, Clone, Copy)]
enum Fault {
    /// Fail this many more calls, then pass through
    Remaining(u32),
    Always,
}

/// Wraps a source and fails scripted calls per collection.
///
/// Call counts are kept so drills can check how many attempts were made.
pub struct FlakySource<S> {
    inner: S,
    faults: Mutex<HashMap<Collection, Fault>>,
    calls: Mutex<HashMap<Collection, u32>>,
}

impl<S: DataSource> FlakySource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Fail the first `n` calls for `collection`.
    pub fn fail_first(self, collection: Collection, n: u32) -> Self {
        self.faults.lock().insert(collection, Fault::Remaining(n));
        self
    }

    /// Fail every call for `collection`.
    pub fn fail_always(self, collection: Collection) -> Self {
        self.faults.lock().insert(collection, Fault::Always);
        self
    }

    /// Calls made for `collection` so far, including failed ones.
    pub fn calls(&self, collection: Collection) -> u32 {
        self.calls.lock().get(&collection).copied().unwrap_or(0)
    }

    fn should_fail(&self, collection: Collection) -> bool {
        let mut faults = self.faults.lock();
        match faults.get_mut(&collection) {
            Some(Fault::Always) => true,
            Some(Fault::Remaining(n)) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl<S: DataSource> DataSource for FlakySource<S> {
    async fn fetch(&self, collection: Collection, limit: usize) -> Result<Vec<Record>, SourceError> {
        *self.calls.lock().entry(collection).or_insert(0) += 1;

        if self.should_fail(collection) {
            tracing::debug!(collection = %collection, "Injecting simulated outage");
            return Err(SourceError::Unavailable(format!(
                "{} (simulated outage)",
                collection
            )));
        }

        self.inner.fetch(collection, limit).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
