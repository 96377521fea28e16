//! Directed multigraph over format identifiers.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use fr_convert::builtin::ALIAS_PAIRS;
use fr_convert::ConverterRegistry;

/// Edge weight for ordinary conversions.
const DEFAULT_WEIGHT: f64 = 1.0;
/// Edge weight for alias pairs (same bytes, different extension), so routes
/// through a rename are preferred over real conversions.
const ALIAS_WEIGHT: f64 = 0.5;

/// One outgoing edge of the format graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Destination format.
    pub to: String,
    /// Registry key of the converter backing this edge.
    pub key: String,
    /// Routing cost.
    pub weight: f64,
}

/// One hop of a planned conversion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub from: String,
    pub to: String,
}

fn is_alias(a: &str, b: &str) -> bool {
    ALIAS_PAIRS
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

/// Heap entry for the bounded cheapest-first search. Ordered so the
/// `BinaryHeap` pops the lowest cost first.
struct SearchState {
    cost: f64,
    hops: usize,
    format: String,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.hops == other.hops
    }
}
impl Eq for SearchState {}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.hops.cmp(&self.hops))
    }
}
impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Directed multigraph of registered conversions.
#[derive(Debug, Clone, Default)]
pub struct FormatGraph {
    adjacency: HashMap<String, Vec<Edge>>,
    max_hops: usize,
}

impl FormatGraph {
    pub fn new(max_hops: usize) -> Self {
        Self {
            adjacency: HashMap::new(),
            max_hops,
        }
    }

    /// Derive the graph from the registry's registered pairs. Alias pairs
    /// get the reduced weight, everything else the default.
    pub fn from_registry(registry: &ConverterRegistry, max_hops: usize) -> Self {
        let mut graph = Self::new(max_hops);
        for (input, output) in registry.all_pairs() {
            let weight = if is_alias(&input, &output) {
                ALIAS_WEIGHT
            } else {
                DEFAULT_WEIGHT
            };
            graph.add_edge(&input, &output, weight);
        }
        graph
    }

    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64) {
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .push(Edge {
                to: to.to_string(),
                key: fr_convert::converter_key(from, to),
                weight,
            });
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// All formats that appear as a source or destination, sorted.
    pub fn formats(&self) -> Vec<String> {
        let mut formats = BTreeSet::new();
        for (from, edges) in &self.adjacency {
            formats.insert(from.clone());
            for edge in edges {
                formats.insert(edge.to.clone());
            }
        }
        formats.into_iter().collect()
    }

    /// All directly registered (from, to) edges, sorted.
    pub fn direct_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .adjacency
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(|e| (from.clone(), e.to.clone())))
            .collect();
        pairs.sort();
        pairs
    }

    /// Plan a path from `from` to `to`.
    ///
    /// Identity yields an empty path. A direct edge always wins, regardless
    /// of whether a multi-hop route would be cheaper. Otherwise a
    /// cheapest-first search runs, never extending a route beyond
    /// `max_hops` transitions. `None` means unreachable within the bound.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<PathStep>> {
        if from == to {
            return Some(Vec::new());
        }

        if self.max_hops >= 1 {
            if let Some(edges) = self.adjacency.get(from) {
                if edges.iter().any(|e| e.to == to) {
                    return Some(vec![PathStep {
                        from: from.to_string(),
                        to: to.to_string(),
                    }]);
                }
            }
        }

        if self.max_hops < 2 {
            return None;
        }

        // Dijkstra over (format, hops) states; a format may be worth
        // revisiting at a lower hop count even at a higher cost.
        let mut best: HashMap<(String, usize), f64> = HashMap::new();
        let mut prev: HashMap<(String, usize), (String, usize)> = HashMap::new();
        let mut heap = BinaryHeap::new();

        best.insert((from.to_string(), 0), 0.0);
        heap.push(SearchState {
            cost: 0.0,
            hops: 0,
            format: from.to_string(),
        });

        while let Some(SearchState { cost, hops, format }) = heap.pop() {
            if format == to {
                let mut path = Vec::new();
                let mut cursor = (format, hops);
                while let Some(parent) = prev.get(&cursor) {
                    path.push(PathStep {
                        from: parent.0.clone(),
                        to: cursor.0.clone(),
                    });
                    cursor = parent.clone();
                }
                path.reverse();
                return Some(path);
            }

            if hops == self.max_hops {
                continue;
            }
            if best
                .get(&(format.clone(), hops))
                .map_or(false, |&c| cost > c)
            {
                continue;
            }

            for edge in self.adjacency.get(&format).into_iter().flatten() {
                let next_cost = cost + edge.weight;
                let next_key = (edge.to.clone(), hops + 1);
                if best.get(&next_key).map_or(true, |&c| next_cost < c) {
                    best.insert(next_key.clone(), next_cost);
                    prev.insert(next_key, (format.clone(), hops));
                    heap.push(SearchState {
                        cost: next_cost,
                        hops: hops + 1,
                        format: edge.to.clone(),
                    });
                }
            }
        }

        None
    }

    /// All formats reachable from `from` within the hop bound, sorted.
    /// Excludes `from` itself.
    pub fn reachable_from(&self, from: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut frontier = vec![from.to_string()];

        for _ in 0..self.max_hops {
            let mut next = Vec::new();
            for format in frontier {
                for edge in self.adjacency.get(&format).into_iter().flatten() {
                    if edge.to != from && seen.insert(edge.to.clone()) {
                        next.push(edge.to.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        seen.into_iter().collect()
    }
}
