// src/ledger.rs - Already-seen business identities
use std::collections::HashSet;
use std::sync::Mutex;

/// Case-insensitive set of business names processed in this run or already
/// present in the store. `claim` is the only write path candidates go
/// through: the locked insert makes check-and-mark a single step, so two
/// concurrent evaluations of the same name can never both win.
#[derive(Debug, Default)]
pub struct DedupLedger {
    names: Mutex<HashSet<String>>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = self.names.lock().expect("ledger poisoned");
        for name in names {
            set.insert(normalize(name.as_ref()));
        }
    }

    pub fn seen(&self, name: &str) -> bool {
        self.names
            .lock()
            .expect("ledger poisoned")
            .contains(&normalize(name))
    }

    pub fn mark(&self, name: &str) {
        self.names
            .lock()
            .expect("ledger poisoned")
            .insert(normalize(name));
    }

    /// Mark `name` and report whether this call was the first to do so.
    pub fn claim(&self, name: &str) -> bool {
        self.names
            .lock()
            .expect("ledger poisoned")
            .insert(normalize(name))
    }

    pub fn len(&self) -> usize {
        self.names.lock().expect("ledger poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
