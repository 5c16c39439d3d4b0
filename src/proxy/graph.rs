//! Ordering of downstream updates.
//!
//! [`ConsumerGraph`] captures a proxy and every proxy that transitively consumes it, with
//! one edge per producer/consumer pair inside that set. [`ConsumerGraph::topological_levels`]
//! splits the set into levels such that every proxy appears after all of its producers,
//! which lets [`Proxy::update_self_and_all_inputs`](crate::proxy::Proxy::update_self_and_all_inputs)
//! update each proxy exactly once, even in diamond-shaped pipelines.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    sync::Arc,
};

use crate::{proxy::ProxyRc, Error::GraphError, GlobalId, Result};

/// The downstream closure of one proxy.
pub(crate) struct ConsumerGraph {
    /// Every proxy of the closure, keyed by global id
    nodes: BTreeMap<GlobalId, ProxyRc>,
    /// Producers of each proxy, restricted to the closure
    dependencies: HashMap<GlobalId, BTreeSet<GlobalId>>,
}

impl ConsumerGraph {
    /// Collects `root` and its transitive consumers with a breadth-first walk.
    ///
    /// # Errors
    /// Returns [`crate::Error::GraphError`] if a consumer lies more than `max_depth` hops
    /// downstream of `root`.
    pub fn build(root: &ProxyRc, max_depth: usize) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        let mut dependencies: HashMap<GlobalId, BTreeSet<GlobalId>> = HashMap::new();
        let mut queue = VecDeque::new();

        nodes.insert(root.global_id(), root.clone());
        dependencies.insert(root.global_id(), BTreeSet::new());
        queue.push_back((root.clone(), 0_usize));

        while let Some((producer, depth)) = queue.pop_front() {
            for consumer in producer.consumers() {
                let id = consumer.global_id();
                dependencies
                    .entry(id)
                    .or_default()
                    .insert(producer.global_id());

                if let Some(known) = nodes.get(&id) {
                    if !Arc::ptr_eq(known, &consumer) {
                        return Err(GraphError(format!(
                            "Two live proxies share global id {id}"
                        )));
                    }
                    continue;
                }

                if depth + 1 > max_depth {
                    return Err(GraphError(format!(
                        "Consumer graph of {}.{} is deeper than {} levels",
                        root.group(),
                        root.xml_name(),
                        max_depth
                    )));
                }

                nodes.insert(id, consumer.clone());
                queue.push_back((consumer, depth + 1));
            }
        }

        Ok(ConsumerGraph {
            nodes,
            dependencies,
        })
    }

    /// Number of proxies in the closure, root included.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Splits the closure into levels whose proxies only depend on earlier levels.
    ///
    /// Proxies inside a level are ordered by global id.
    ///
    /// # Errors
    /// Returns [`crate::Error::GraphError`] if the consumers form a cycle.
    pub fn topological_levels(&self) -> Result<Vec<Vec<ProxyRc>>> {
        let mut levels = Vec::new();
        let mut unscheduled: BTreeSet<GlobalId> = self.nodes.keys().copied().collect();
        let mut satisfied = BTreeSet::new();

        while !unscheduled.is_empty() {
            let ready: Vec<GlobalId> = unscheduled
                .iter()
                .filter(|id| {
                    self.dependencies
                        .get(id)
                        .map_or(true, |producers| producers.is_subset(&satisfied))
                })
                .copied()
                .collect();

            if ready.is_empty() {
                return Err(GraphError(format!(
                    "Unable to order {} consumers, possible circular dependency",
                    unscheduled.len()
                )));
            }

            let mut level = Vec::with_capacity(ready.len());
            for id in ready {
                unscheduled.remove(&id);
                satisfied.insert(id);
                if let Some(proxy) = self.nodes.get(&id) {
                    level.push(proxy.clone());
                }
            }
            levels.push(level);
        }

        Ok(levels)
    }
}
