use crate::NodeId;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// One connected component of the GIC branch graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IslandSummary {
    pub island_id: usize,
    /// Members in node order (substations first)
    pub nodes: Vec<NodeId>,
    /// True when at least one member is a substation, i.e. the island has a
    /// path to ground
    pub grounded: bool,
}

/// Aggregated island analysis result.
#[derive(Debug, Clone)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
}

impl IslandAnalysis {
    pub fn floating(&self) -> impl Iterator<Item = &IslandSummary> {
        self.islands.iter().filter(|island| !island.grounded)
    }
}

/// Labels connected components (breadth-first search) of the graph spanned
/// by `edges`. Islands are numbered in order of their smallest node.
pub fn find_islands<I>(edges: I) -> IslandAnalysis
where
    I: IntoIterator<Item = (NodeId, NodeId)>,
{
    let mut graph: UnGraph<NodeId, ()> = UnGraph::new_undirected();
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
    let mut ordered = BTreeSet::new();

    for (from, to) in edges {
        let a = *index.entry(from).or_insert_with(|| graph.add_node(from));
        let b = *index.entry(to).or_insert_with(|| graph.add_node(to));
        graph.add_edge(a, b, ());
        ordered.insert(from);
        ordered.insert(to);
    }

    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    for start in ordered {
        let start = index[&start];
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(graph[node]);
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort();
        islands.push(IslandSummary {
            island_id: islands.len(),
            grounded: members.iter().any(NodeId::is_substation),
            nodes: members,
        });
    }

    IslandAnalysis { islands }
}

/// Islands with no substation. Any such island makes the grounded Laplacian
/// singular, so callers report these before attempting an inverse.
pub fn floating_islands<I>(edges: I) -> Vec<IslandSummary>
where
    I: IntoIterator<Item = (NodeId, NodeId)>,
{
    find_islands(edges).floating().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_grounded_and_floating_components() {
        let edges = vec![
            (NodeId::bus(1), NodeId::substation(1)),
            (NodeId::bus(1), NodeId::bus(2)),
            (NodeId::bus(7), NodeId::bus(8)),
        ];
        let analysis = find_islands(edges.clone());
        assert_eq!(analysis.islands.len(), 2);
        assert!(analysis.islands[0].grounded);
        assert_eq!(analysis.islands[0].nodes[0], NodeId::substation(1));

        let floating = floating_islands(edges);
        assert_eq!(floating.len(), 1);
        assert_eq!(floating[0].nodes, vec![NodeId::bus(7), NodeId::bus(8)]);
    }

    #[test]
    fn empty_edge_list_has_no_islands() {
        assert!(find_islands(Vec::new()).islands.is_empty());
    }
}
