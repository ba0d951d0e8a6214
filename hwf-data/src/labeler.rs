//! Connected components of the extreme-event adjacency graph.

use crate::graph::AdjacencyEdge;
use hwf_core::error::{HeatwaveError, Result};
use hwf_core::record::ComponentId;
use std::collections::HashMap;

/// Array-backed union-find with path halving and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        DisjointSet {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets holding `a` and `b`; false if they were already one set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Component id of every event, plus the size of each component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLabels {
    labels: Vec<ComponentId>,
    /// Indexed by component id; entry 0 counts the isolated events.
    sizes: Vec<usize>,
}

impl ComponentLabels {
    pub fn label(&self, event_id: usize) -> ComponentId {
        self.labels[event_id]
    }

    pub fn labels(&self) -> &[ComponentId] {
        &self.labels
    }

    /// Number of real (non-placeholder) components.
    pub fn n_components(&self) -> usize {
        self.sizes.len() - 1
    }

    pub fn n_isolated(&self) -> usize {
        self.sizes[0]
    }

    pub fn size(&self, cp: ComponentId) -> usize {
        self.sizes.get(cp.0 as usize).copied().unwrap_or(0)
    }

    /// Member event ids of every component, indexed by component id.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members: Vec<Vec<usize>> = self.sizes.iter().map(|&n| Vec::with_capacity(n)).collect();
        for (id, cp) in self.labels.iter().enumerate() {
            members[cp.0 as usize].push(id);
        }
        members
    }
}

/// Accumulates adjacency edges, possibly over several batches, then labels.
///
/// The final labels depend only on the set of edges absorbed, never on batch
/// boundaries or edge order: components are numbered from 1 by descending
/// size, ties going to the component holding the smallest event id. Events
/// without any edge share [`ComponentId::ISOLATED`].
#[derive(Debug, Clone)]
pub struct ComponentLabeler {
    set: DisjointSet,
    linked: Vec<bool>,
    n_edges: usize,
}

impl ComponentLabeler {
    pub fn new(n_events: usize) -> Self {
        ComponentLabeler {
            set: DisjointSet::new(n_events),
            linked: vec![false; n_events],
            n_edges: 0,
        }
    }

    pub fn absorb(&mut self, edges: &[AdjacencyEdge]) -> Result<()> {
        let len = self.set.len();
        for edge in edges {
            for id in [edge.source, edge.target] {
                if id >= len {
                    return Err(HeatwaveError::UnknownEvent { id, len });
                }
            }
            self.set.union(edge.source, edge.target);
            self.linked[edge.source] = true;
            self.linked[edge.target] = true;
        }
        self.n_edges += edges.len();
        Ok(())
    }

    pub fn finish(mut self) -> ComponentLabels {
        // root -> (size, smallest member); ids are visited in ascending order
        let mut groups: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut roots = vec![usize::MAX; self.set.len()];
        for id in 0..self.set.len() {
            if !self.linked[id] {
                continue;
            }
            let root = self.set.find(id);
            roots[id] = root;
            groups.entry(root).or_insert((0, id)).0 += 1;
        }

        let mut ordered: Vec<(usize, usize, usize)> = groups
            .into_iter()
            .map(|(root, (size, first))| (root, size, first))
            .collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let mut component_of: HashMap<usize, ComponentId> = HashMap::with_capacity(ordered.len());
        let mut sizes = Vec::with_capacity(ordered.len() + 1);
        sizes.push(self.linked.iter().filter(|l| !**l).count());
        for (i, (root, size, _)) in ordered.into_iter().enumerate() {
            component_of.insert(root, ComponentId(i as u32 + 1));
            sizes.push(size);
        }

        let labels: Vec<ComponentId> = roots
            .iter()
            .map(|root| component_of.get(root).copied().unwrap_or(ComponentId::ISOLATED))
            .collect();

        log::info!(
            "labeler: {} edges -> {} components, {} isolated events",
            self.n_edges,
            sizes.len() - 1,
            sizes[0]
        );
        ComponentLabels { labels, sizes }
    }
}
