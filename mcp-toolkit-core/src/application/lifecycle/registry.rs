use crate::application::tooling::{Toolkit, ToolkitId, ToolkitInner};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

static GLOBAL: Lazy<Arc<ActiveToolkits>> = Lazy::new(|| Arc::new(ActiveToolkits::new()));

/// Toolkits that currently hold a live connection, tracked so a shutdown sweep
/// can find them. Membership is weak: the registry never keeps a toolkit alive.
#[derive(Default)]
pub struct ActiveToolkits {
    members: Mutex<HashMap<ToolkitId, Weak<ToolkitInner>>>,
}

impl ActiveToolkits {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry toolkits use unless built with another one.
    pub fn global() -> Arc<ActiveToolkits> {
        Arc::clone(&GLOBAL)
    }

    pub fn register(&self, toolkit: &Toolkit) {
        self.members().insert(toolkit.id(), toolkit.downgrade());
    }

    /// Remove `id`; returns whether it was a member. Check and removal happen
    /// under one lock, so concurrent callers see exactly one `true`.
    pub fn unregister(&self, id: ToolkitId) -> bool {
        self.members().remove(&id).is_some()
    }

    pub fn contains(&self, id: ToolkitId) -> bool {
        self.members()
            .get(&id)
            .is_some_and(|member| member.strong_count() > 0)
    }

    /// Copy of the live members; entries whose toolkit is gone are pruned.
    pub fn snapshot(&self) -> Vec<Toolkit> {
        let mut members = self.members();
        members.retain(|_, member| member.strong_count() > 0);
        members
            .values()
            .filter_map(Weak::upgrade)
            .map(Toolkit::from_inner)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members()
            .values()
            .filter(|member| member.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn members(&self) -> MutexGuard<'_, HashMap<ToolkitId, Weak<ToolkitInner>>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
