//! Best-first search over rewritten graphs
//!
//! The driver pops the cheapest unexplored graph from a min-priority
//! frontier, applies every registered substitution at every match, and pushes
//! the surviving children. Children are deduplicated by structural hash, and
//! graphs costing more than `beta` times the best cost seen so far are pruned
//! when popped. The `budget` bounds how many popped graphs may be expanded.
//!
//! The whole loop is deterministic: substitutions run in registration order,
//! matches enumerate in guid order, and frontier ties break by insertion
//! order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use tracing::debug;

use rewire_graph::{Graph, Model};

use crate::error::SearchResult;
use crate::matcher::enumerate_matches;
use crate::rewrite::apply;
use crate::xfer::Xfer;

/// Search parameters
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    /// Maximum number of expanded graphs
    pub budget: usize,
    /// Slack factor (>= 1.0) on the best cost: graphs up to `beta * best`
    /// stay in play, which lets the search climb out of local minima through
    /// temporarily-worse intermediates
    pub beta: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            budget: 300,
            beta: 1.01,
        }
    }
}

/// Result of a search run
pub struct SearchOutcome {
    /// The cheapest graph found
    pub graph: Graph,
    /// Number of popped graphs that produced at least one rewrite
    pub expanded: usize,
    /// Children discarded because their hash was already seen
    pub duplicates_skipped: usize,
}

/// Frontier entry: min-ordered by cost, ties broken by insertion order
struct Candidate {
    cost: f64,
    seq: u64,
    graph: Graph,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we want the cheapest on top
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Minimize the cost of `graph` by best-first exploration of rewrites.
///
/// Returns the cheapest graph reached within the budget, together with the
/// search counters. Given identical inputs, substitutions, and configuration,
/// the outcome is identical.
pub fn optimize(
    graph: Graph,
    model: &mut Model,
    xfers: &[Xfer],
    config: &SearchConfig,
) -> SearchResult<SearchOutcome> {
    let mut seen: HashSet<u64> = HashSet::new();
    seen.insert(graph.hash()?);

    let mut best = graph.clone();
    let mut best_cost = graph.total_cost();

    let mut frontier = BinaryHeap::new();
    let mut seq: u64 = 0;
    frontier.push(Candidate {
        cost: best_cost,
        seq,
        graph,
    });

    let mut expanded = 0usize;
    let mut duplicates_skipped = 0usize;

    while let Some(candidate) = frontier.pop() {
        let current = candidate.graph;
        let cost = candidate.cost;

        if cost < best_cost {
            best_cost = cost;
            best = current.clone();
        }
        if cost > config.beta * best_cost {
            continue;
        }
        if expanded > config.budget {
            break;
        }

        let mut produced = 0usize;
        for xfer in xfers {
            for binding in enumerate_matches(xfer, &current) {
                let Some(child) = apply(xfer, &binding, &current, model)? else {
                    continue;
                };
                produced += 1;
                let hash = child.hash()?;
                if !seen.insert(hash) {
                    duplicates_skipped += 1;
                    continue;
                }
                seq += 1;
                frontier.push(Candidate {
                    cost: child.total_cost(),
                    seq,
                    graph: child,
                });
            }
        }
        if produced > 0 {
            expanded += 1;
            if expanded % 100 == 0 {
                debug!(
                    expanded,
                    best_cost,
                    frontier = frontier.len(),
                    "search progress"
                );
            }
        }
    }

    debug!(
        expanded,
        duplicates_skipped, best_cost, "search finished"
    );
    Ok(SearchOutcome {
        graph: best,
        expanded,
        duplicates_skipped,
    })
}
