//! Locators owned by running transfers

use super::traits::Locator;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Set of locators a running download is still writing or committing
///
/// Orphan cleanup skips these whatever their age, so a stalled transfer keeps
/// its staged bytes. Entries are removed when their [`InFlightGuard`] drops.
#[derive(Clone, Debug, Default)]
pub struct InFlightContent {
    locators: Arc<Mutex<HashSet<Locator>>>,
}

impl InFlightContent {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `locator` as owned until the returned guard drops
    pub fn track(&self, locator: Locator) -> InFlightGuard {
        self.with(|set| set.insert(locator.clone()));
        InFlightGuard {
            owner: self.clone(),
            locator,
        }
    }

    /// Locators owned right now
    pub fn snapshot(&self) -> HashSet<Locator> {
        self.with(|set| set.clone())
    }

    fn with<T>(&self, f: impl FnOnce(&mut HashSet<Locator>) -> T) -> T {
        // A panic while holding the lock cannot leave the set half-updated
        let mut set = self
            .locators
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut set)
    }
}

/// Releases a tracked locator on drop
#[derive(Debug)]
pub struct InFlightGuard {
    owner: InFlightContent,
    locator: Locator,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner.with(|set| set.remove(&self.locator));
    }
}
