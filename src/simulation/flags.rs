use std::collections::BTreeSet;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::debug;

use crate::core::observers::{ObserverId, Observers};

/// Session-wide progression flags. Present or absent, never a payload.
#[derive(Resource, Debug, Default)]
pub struct FlagStore {
    flags: BTreeSet<String>,
    on_set: Observers<FlagStore, str>,
}

impl FlagStore {
    /// Returns true only on first insertion, which is also the only time observers hear about it.
    pub fn set(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if !self.flags.insert(name.to_string()) {
            return false;
        }
        debug!(flag = name, "flag set");
        self.on_set.emit(self, name);
        true
    }

    pub fn has(&self, name: &str) -> bool {
        let name = name.trim();
        !name.is_empty() && self.flags.contains(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.flags.remove(name.trim())
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }

    /// Replace the whole set without notifying (save loading).
    pub fn restore(&mut self, flags: impl IntoIterator<Item = String>) {
        self.flags = flags
            .into_iter()
            .map(|flag| flag.trim().to_string())
            .filter(|flag| !flag.is_empty())
            .collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn on_set(
        &mut self,
        callback: impl Fn(&FlagStore, &str) + Send + Sync + 'static,
    ) -> ObserverId {
        self.on_set.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.on_set.unsubscribe(id)
    }
}
