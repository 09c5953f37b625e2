//! Immutable DAG over the codes of a coding system.
//!
//! Edges point from parent to child. A node may have several parents, so
//! the graph is not necessarily a tree. The hierarchy is validated once at
//! construction (acyclic, every node reachable from the root) and never
//! mutated afterwards, so it can be shared freely between concurrent
//! read-only queries.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, instrument};

use crate::domain::entities::Code;
use crate::domain::error::{DomainError, DomainResult};

static NO_CODES: BTreeSet<Code> = BTreeSet::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    root: Code,
    nodes: BTreeSet<Code>,
    /// child -> parents, only for nodes with at least one parent
    parent_map: BTreeMap<Code, BTreeSet<Code>>,
    /// parent -> children, only for nodes with at least one child
    child_map: BTreeMap<Code, BTreeSet<Code>>,
    /// every node appears after all of its parents
    topo_order: Vec<Code>,
}

impl Hierarchy {
    /// Build a hierarchy from a root code and `(parent, child)` edges.
    ///
    /// # Errors
    /// - [`DomainError::CyclicGraph`] if the edges contain a cycle
    /// - [`DomainError::InvalidGraph`] if a code cannot be reached from `root`
    #[instrument(level = "debug", skip(root, edges))]
    pub fn new<I, P, C>(root: impl Into<Code>, edges: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<Code>,
        C: Into<Code>,
    {
        let root = root.into();
        let mut nodes = BTreeSet::from([root.clone()]);
        let mut parent_map: BTreeMap<Code, BTreeSet<Code>> = BTreeMap::new();
        let mut child_map: BTreeMap<Code, BTreeSet<Code>> = BTreeMap::new();

        for (parent, child) in edges {
            let (parent, child) = (parent.into(), child.into());
            nodes.insert(parent.clone());
            nodes.insert(child.clone());
            parent_map.entry(child.clone()).or_default().insert(parent.clone());
            child_map.entry(parent).or_default().insert(child);
        }

        let topo_order = topological_order(&nodes, &parent_map, &child_map)?;
        check_reachable(&root, &nodes, &child_map)?;

        debug!(
            "hierarchy: root={} nodes={} edges={}",
            root,
            nodes.len(),
            parent_map.values().map(BTreeSet::len).sum::<usize>()
        );

        Ok(Self {
            root,
            nodes,
            parent_map,
            child_map,
            topo_order,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn nodes(&self) -> &BTreeSet<Code> {
        &self.nodes
    }

    pub fn contains(&self, code: &str) -> bool {
        self.nodes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent_map(&self) -> &BTreeMap<Code, BTreeSet<Code>> {
        &self.parent_map
    }

    pub fn child_map(&self) -> &BTreeMap<Code, BTreeSet<Code>> {
        &self.child_map
    }

    /// Direct parents; empty for the root and for unknown codes.
    pub fn parents(&self, code: &str) -> &BTreeSet<Code> {
        self.parent_map.get(code).unwrap_or(&NO_CODES)
    }

    /// Direct children; empty for leaves and for unknown codes.
    pub fn children(&self, code: &str) -> &BTreeSet<Code> {
        self.child_map.get(code).unwrap_or(&NO_CODES)
    }

    /// All codes reachable by following parent edges, excluding `code` itself.
    pub fn ancestors(&self, code: &str) -> BTreeSet<Code> {
        walk(code, |c| self.parents(c))
    }

    /// All codes reachable by following child edges, excluding `code` itself.
    pub fn descendants(&self, code: &str) -> BTreeSet<Code> {
        walk(code, |c| self.children(c))
    }

    /// Reduce `candidates` to the members with no proper ancestor also in
    /// `candidates`: the minimal roots from which every candidate can be shown.
    ///
    /// "Has a candidate above it" is memoized per node and computed in
    /// topological order over the ancestor closure of the candidates, so the
    /// result does not depend on iteration order.
    #[instrument(level = "debug", skip_all, fields(candidates = candidates.len()))]
    pub fn filter_to_ultimate_ancestors(&self, candidates: &BTreeSet<Code>) -> BTreeSet<Code> {
        let mut relevant: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = candidates.iter().map(String::as_str).collect();
        while let Some(code) = queue.pop_front() {
            if relevant.insert(code) {
                queue.extend(self.parents(code).iter().map(String::as_str));
            }
        }

        let mut covered: HashMap<&str, bool> = HashMap::with_capacity(relevant.len());
        for code in self.topo_order.iter().map(String::as_str) {
            if !relevant.contains(code) {
                continue;
            }
            let below_candidate = self
                .parents(code)
                .iter()
                .any(|p| candidates.contains(p) || covered.get(p.as_str()).copied().unwrap_or(false));
            covered.insert(code, below_candidate);
        }

        candidates
            .iter()
            .filter(|c| !covered.get(c.as_str()).copied().unwrap_or(false))
            .cloned()
            .collect()
    }
}

fn walk<'a, F>(start: &str, next: F) -> BTreeSet<Code>
where
    F: Fn(&str) -> &'a BTreeSet<Code>,
{
    let mut seen = BTreeSet::new();
    let mut stack: Vec<&'a Code> = next(start).iter().collect();
    while let Some(code) = stack.pop() {
        if seen.insert(code.clone()) {
            stack.extend(next(code).iter());
        }
    }
    seen
}

/// Kahn's algorithm. Nodes left with unprocessed parents sit on a cycle
/// (or below one); the smallest of them is reported.
fn topological_order(
    nodes: &BTreeSet<Code>,
    parent_map: &BTreeMap<Code, BTreeSet<Code>>,
    child_map: &BTreeMap<Code, BTreeSet<Code>>,
) -> DomainResult<Vec<Code>> {
    let mut in_degree: HashMap<&str, usize> = nodes
        .iter()
        .map(|n| (n.as_str(), parent_map.get(n).map_or(0, BTreeSet::len)))
        .collect();
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|n| in_degree.get(n).copied() == Some(0))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(code) = queue.pop_front() {
        order.push(code.to_string());
        for child in child_map.get(code).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(child.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let done: HashSet<&str> = order.iter().map(String::as_str).collect();
        if let Some(code) = nodes.iter().find(|n| !done.contains(n.as_str())) {
            return Err(DomainError::CyclicGraph(code.clone()));
        }
    }
    Ok(order)
}

fn check_reachable(
    root: &str,
    nodes: &BTreeSet<Code>,
    child_map: &BTreeMap<Code, BTreeSet<Code>>,
) -> DomainResult<()> {
    let mut reached: HashSet<&str> = HashSet::from([root]);
    let mut stack = vec![root];
    while let Some(code) = stack.pop() {
        for child in child_map.get(code).into_iter().flatten() {
            if reached.insert(child) {
                stack.push(child);
            }
        }
    }

    match nodes.iter().find(|n| !reached.contains(n.as_str())) {
        Some(code) => Err(DomainError::InvalidGraph {
            code: code.clone(),
            reason: format!("not reachable from root {root}"),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_root_without_edges() {
        let h = Hierarchy::new("a", Vec::<(Code, Code)>::new()).unwrap();
        assert_eq!(h.len(), 1);
        assert!(h.ancestors("a").is_empty());
        assert!(h.descendants("a").is_empty());
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let h = Hierarchy::new("a", [("a", "b"), ("b", "c"), ("a", "c")]).unwrap();
        let pos = |c: &str| h.topo_order.iter().position(|x| x == c).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn duplicate_edges_collapse() {
        let h = Hierarchy::new("a", [("a", "b"), ("a", "b")]).unwrap();
        assert_eq!(h.children("a").len(), 1);
        assert_eq!(h.parents("b").len(), 1);
    }
}
