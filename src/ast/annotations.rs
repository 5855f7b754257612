//! Annotation contexts attached to an AST.
//!
//! A side table keyed by [`NodeId`] carries the canonical name of every
//! pattern entity: the user alias when one was written, or a generated
//! `@anon_N` name otherwise. The anonymous counter is monotonically
//! increasing for the lifetime of the collection, so repeated lookups always
//! return the same string.

use crate::ast::query::NodeId;
use smol_str::SmolStr;
use std::collections::HashMap;

/// The annotation-context collection shared by a master AST and all of its
/// segments.
#[derive(Debug, Default)]
pub struct Annotations {
    /// Next anonymous-entity ordinal.
    anon_count: u32,
    /// Canonical names of anonymous pattern entities.
    names: HashMap<NodeId, SmolStr>,
}

impl Annotations {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical name assigned to `id`, if any.
    pub fn name_of(&self, id: NodeId) -> Option<SmolStr> {
        self.names.get(&id).cloned()
    }

    /// Returns the canonical name for `id`, generating and caching an
    /// `@anon_N` name on first use.
    pub fn name_anonymous(&mut self, id: NodeId) -> SmolStr {
        if let Some(name) = self.names.get(&id) {
            return name.clone();
        }
        let name = SmolStr::new(format!("@anon_{}", self.anon_count));
        self.anon_count += 1;
        self.names.insert(id, name.clone());
        name
    }

    /// Number of anonymous names generated so far.
    pub fn anon_count(&self) -> u32 {
        self.anon_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_names_are_stable() {
        let mut annotations = Annotations::new();
        let a = annotations.name_anonymous(NodeId(0));
        let b = annotations.name_anonymous(NodeId(1));
        assert_eq!(a, "@anon_0");
        assert_eq!(b, "@anon_1");

        // repeated lookups return the cached name, not a new ordinal
        assert_eq!(annotations.name_anonymous(NodeId(0)), "@anon_0");
        assert_eq!(annotations.anon_count(), 2);
    }

    #[test]
    fn name_of_misses_until_assigned() {
        let mut annotations = Annotations::new();
        assert!(annotations.name_of(NodeId(7)).is_none());
        annotations.name_anonymous(NodeId(7));
        assert_eq!(annotations.name_of(NodeId(7)).unwrap(), "@anon_0");
    }
}
