use std::sync::RwLock;

use url::Url;

/// The page location the link flow reads and drives.
pub trait Navigator: Send + Sync {
    fn current_url(&self) -> Url;
    /// Leave for `url`, as a full navigation.
    fn assign(&self, url: &Url);
    /// Rewrite the current location without adding a history entry.
    fn replace(&self, url: &Url);
}

/// Keeps the location in memory and records where it was sent.
pub struct MemoryNavigator {
    current: RwLock<Url>,
    assigned: RwLock<Vec<Url>>,
}

impl MemoryNavigator {
    pub fn new(url: Url) -> Self {
        MemoryNavigator {
            current: RwLock::new(url),
            assigned: RwLock::new(Vec::new()),
        }
    }

    /// Every URL passed to `assign`, oldest first.
    pub fn assigned(&self) -> Vec<Url> {
        self.assigned
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_current(&self, url: &Url) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = url.clone();
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Url {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn assign(&self, url: &Url) {
        self.assigned
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(url.clone());
        self.set_current(url);
    }

    fn replace(&self, url: &Url) {
        self.set_current(url);
    }
}
