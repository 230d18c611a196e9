//! Multi-selection of contact ids for bulk actions

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one id; returns whether it is now selected
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    /// Select every displayed id, or clear if all are already selected
    pub fn toggle_all<'a, I>(&mut self, displayed: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let displayed: Vec<&str> = displayed.into_iter().collect();
        let all_selected =
            !displayed.is_empty() && displayed.iter().all(|id| self.ids.contains(*id));
        if all_selected {
            self.ids.clear();
        } else {
            self.ids = displayed.into_iter().map(str::to_string).collect();
        }
    }

    /// Drop ids no longer displayed
    pub fn prune<'a, I>(&mut self, displayed: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let displayed: BTreeSet<&str> = displayed.into_iter().collect();
        self.ids.retain(|id| displayed.contains(id.as_str()));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in stable order
    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}
