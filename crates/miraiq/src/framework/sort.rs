// Ordering engine: DFS topological sort over handlers or routers, plus the
// default-last policy applied when the bot builds.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Ordering input expressed over opaque identities (pointer addresses of
/// the shared records). `ids[i]` is the identity of item `i`; edges say
/// "u runs before v".
pub(crate) struct SortInput {
    pub ids: Vec<usize>,
    /// Per item: identities it must run before
    pub before: Vec<Vec<usize>>,
    /// Per item: identities it must run after
    pub after: Vec<Vec<usize>>,
    /// Extra `(u, v)` identity pairs from `add_order`
    pub extra: Vec<(usize, usize)>,
    /// Identity of the default item, if the default-last policy applies
    pub default: Option<usize>,
}

/// Standard DFS topological sort yielding a reversed post-order. Returns
/// `None` when the edges contain a cycle. Deterministic: nodes are visited
/// in index order, neighbours in edge insertion order.
pub(crate) fn topological_sort(n: usize, edges: &[(usize, usize)]) -> Option<Vec<usize>> {
    let mut graph: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(u, v) in edges {
        graph[u].push(v);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        White,
        Grey,
        Black,
    }

    fn dfs(u: usize, graph: &[Vec<usize>], marks: &mut [Mark], order: &mut Vec<usize>) -> bool {
        marks[u] = Mark::Grey;
        for &v in &graph[u] {
            match marks[v] {
                Mark::Grey => return false,
                Mark::White => {
                    if !dfs(v, graph, marks, order) {
                        return false;
                    }
                }
                Mark::Black => {}
            }
        }
        marks[u] = Mark::Black;
        order.push(u);
        true
    }

    let mut marks = vec![Mark::White; n];
    let mut order = Vec::with_capacity(n);
    for u in 0..n {
        if marks[u] == Mark::White && !dfs(u, &graph, &mut marks, &mut order) {
            return None;
        }
    }
    order.reverse();
    Some(order)
}

/// Sorts the items of one category. Neighbour lists and extra pairs become
/// edges; when a default item is given, every peer not transitively
/// constrained to run after it is placed before it.
///
/// Returns the index permutation to apply, deduplicated by identity
/// (re-adding the same record keeps its first position).
pub(crate) fn sort_order(input: &SortInput) -> Result<Vec<usize>> {
    // Dedupe by identity, first occurrence wins.
    let mut index: HashMap<usize, usize> = HashMap::new();
    let mut items: Vec<usize> = Vec::new();
    for (i, &id) in input.ids.iter().enumerate() {
        index.entry(id).or_insert_with(|| {
            items.push(i);
            items.len() - 1
        });
    }
    let n = items.len();

    let position = |id: usize| -> Result<usize> {
        index.get(&id).copied().ok_or_else(|| {
            Error::Contract("ordering constraint references an item that was never added".into())
        })
    };

    let mut edges: Vec<(usize, usize)> = Vec::new();
    for (slot, &item) in items.iter().enumerate() {
        for &other in &input.before[item] {
            edges.push((slot, position(other)?));
        }
        for &other in &input.after[item] {
            edges.push((position(other)?, slot));
        }
    }
    for &(u, v) in &input.extra {
        edges.push((position(u)?, position(v)?));
    }

    let cycle_error = || Error::Contract("cannot topologically sort: ordering has a cycle".into());

    if let Some(default_id) = input.default {
        let default = position(default_id)?;
        // Cycles must be reported on the user's own constraints, before the
        // default-last edges are layered on top.
        topological_sort(n, &edges).ok_or_else(cycle_error)?;

        // A peer is "after the default" when the provisional graph has a
        // path default -> ... -> peer.
        let mut graph: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(u, v) in &edges {
            graph[u].push(v);
        }
        let mut after_default = vec![false; n];
        let mut stack = vec![default];
        while let Some(u) = stack.pop() {
            for &v in &graph[u] {
                if !after_default[v] {
                    after_default[v] = true;
                    stack.push(v);
                }
            }
        }
        for slot in 0..n {
            if slot != default && !after_default[slot] {
                edges.push((slot, default));
            }
        }
    }

    let order = topological_sort(n, &edges).ok_or_else(cycle_error)?;
    Ok(order.into_iter().map(|slot| items[slot]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(n: usize) -> SortInput {
        SortInput {
            ids: (0..n).map(|i| 1000 + i).collect(),
            before: vec![Vec::new(); n],
            after: vec![Vec::new(); n],
            extra: Vec::new(),
            default: None,
        }
    }

    fn assert_runs_before(order: &[usize], u: usize, v: usize) {
        let pu = order.iter().position(|&x| x == u).unwrap();
        let pv = order.iter().position(|&x| x == v).unwrap();
        assert!(pu < pv, "expected {u} before {v} in {order:?}");
    }

    #[test]
    fn sort_respects_every_edge() {
        let mut input = input(4);
        input.extra = vec![(1002, 1000), (1003, 1001), (1000, 1001)];
        let order = sort_order(&input).unwrap();
        assert_runs_before(&order, 2, 0);
        assert_runs_before(&order, 3, 1);
        assert_runs_before(&order, 0, 1);
    }

    #[test]
    fn before_and_after_lists_become_edges() {
        let mut input = input(3);
        input.before[0] = vec![1001]; // 0 before 1
        input.after[2] = vec![1001]; // 2 after 1
        let order = sort_order(&input).unwrap();
        assert_runs_before(&order, 0, 1);
        assert_runs_before(&order, 1, 2);
    }

    #[test]
    fn cycle_is_reported() {
        let mut input = input(3);
        input.before[0] = vec![1001];
        input.before[1] = vec![1002];
        input.before[2] = vec![1000];
        match sort_order(&input) {
            Err(Error::Contract(message)) => assert!(message.contains("cycle")),
            other => panic!("expected a contract error, got {other:?}"),
        }
    }

    #[test]
    fn sort_is_deterministic() {
        let mut a = input(5);
        a.extra = vec![(1004, 1000)];
        let mut b = input(5);
        b.extra = vec![(1004, 1000)];
        assert_eq!(sort_order(&a).unwrap(), sort_order(&b).unwrap());
    }

    #[test]
    fn unconstrained_default_goes_last() {
        let mut input = input(4);
        input.default = Some(1000);
        let order = sort_order(&input).unwrap();
        assert_eq!(*order.last().unwrap(), 0);
    }

    #[test]
    fn peer_explicitly_after_default_stays_after_it() {
        let mut input = input(3);
        input.default = Some(1000);
        input.extra = vec![(1000, 1002)]; // 2 runs after the default
        let order = sort_order(&input).unwrap();
        assert_runs_before(&order, 1, 0);
        assert_runs_before(&order, 0, 2);
    }

    #[test]
    fn transitive_after_default_is_honoured() {
        let mut input = input(4);
        input.default = Some(1000);
        // default -> 1 -> 2; 3 is unrelated
        input.extra = vec![(1000, 1001), (1001, 1002)];
        let order = sort_order(&input).unwrap();
        assert_runs_before(&order, 3, 0);
        assert_runs_before(&order, 0, 1);
        assert_runs_before(&order, 1, 2);
    }

    #[test]
    fn unknown_identity_in_order_is_a_contract_error() {
        let mut input = input(2);
        input.extra = vec![(1000, 9999)];
        assert!(matches!(sort_order(&input), Err(Error::Contract(_))));
    }

    #[test]
    fn duplicate_identities_keep_first_position() {
        let mut input = input(3);
        input.ids[2] = 1000; // same record added twice
        let order = sort_order(&input).unwrap();
        assert_eq!(order.len(), 2);
        assert!(order.contains(&0));
        assert!(order.contains(&1));
    }

    #[test]
    fn cycle_with_default_present_is_still_reported() {
        let mut input = input(3);
        input.default = Some(1000);
        input.extra = vec![(1001, 1002), (1002, 1001)];
        assert!(matches!(sort_order(&input), Err(Error::Contract(_))));
    }
}
