//! Dependency ordering of checks.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// The checks that could not be ordered, each with its unresolved dependencies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("A cyclic dependency exists amongst {0:?}")]
pub struct CyclicDependency(pub BTreeMap<String, BTreeSet<String>>);

/// Declared dependencies between named checks, in registration order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<(String, BTreeSet<String>)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a check and the names it depends on. Adding a name twice merges its dependencies.
    pub fn add<I, S>(&mut self, name: impl Into<String>, depends_on: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let deps: BTreeSet<String> = depends_on.into_iter().map(Into::into).collect();
        match self.nodes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.extend(deps),
            None => self.nodes.push((name, deps)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns every added check in an order that satisfies all dependencies.
    ///
    /// Checks taking part in a dependency relation come first, layer by layer; within a layer
    /// they keep registration order. Checks with no relation at all follow in registration
    /// order. Names that are depended on but were never added count as satisfied.
    pub fn resolve(&self) -> Result<Vec<String>, CyclicDependency> {
        let known: HashSet<&str> = self.nodes.iter().map(|(n, _)| n.as_str()).collect();
        let referenced: HashSet<&str> = self
            .nodes
            .iter()
            .flat_map(|(_, deps)| deps.iter().map(String::as_str))
            .collect();

        let mut pending: Vec<(&str, BTreeSet<&str>)> = Vec::new();
        let mut unrelated: Vec<&str> = Vec::new();
        for (name, declared) in &self.nodes {
            if declared.is_empty() && !referenced.contains(name.as_str()) {
                unrelated.push(name.as_str());
                continue;
            }
            let deps: BTreeSet<&str> = declared
                .iter()
                .map(String::as_str)
                .filter(|d| *d != name.as_str() && known.contains(d))
                .collect();
            pending.push((name.as_str(), deps));
        }

        let mut order: Vec<String> = Vec::with_capacity(self.nodes.len());
        loop {
            let layer: Vec<&str> = pending
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(name, _)| *name)
                .collect();
            if layer.is_empty() {
                break;
            }
            pending.retain(|(name, _)| !layer.contains(name));
            for (_, deps) in pending.iter_mut() {
                deps.retain(|d| !layer.contains(d));
            }
            order.extend(layer.into_iter().map(String::from));
        }

        if !pending.is_empty() {
            return Err(CyclicDependency(
                pending
                    .into_iter()
                    .map(|(name, deps)| {
                        (
                            name.to_string(),
                            deps.into_iter().map(String::from).collect(),
                        )
                    })
                    .collect(),
            ));
        }

        order.extend(unrelated.into_iter().map(String::from));
        Ok(order)
    }
}
