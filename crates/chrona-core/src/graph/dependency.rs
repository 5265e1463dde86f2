// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An iterative, cycle-aware depth-first dependency resolver.
//!
//! Unlike a plain topological sort, the graph is discovered while it is being
//! walked: each node is *expanded* the first time it is reached, which yields
//! a payload (for the orchestrator, a freshly built module instance) and the
//! list of nodes it depends on. The walk keeps its own explicit stack and
//! in-progress path, so no recursion and no lock re-entrancy is involved.

use std::collections::HashMap;
use std::hash::Hash;

/// The outcome of a successful resolution.
///
/// `order` lists every newly expanded node in depth-first post-order:
/// dependencies always come before their dependents, and the root comes last.
#[derive(Debug)]
pub struct Resolution<T, N> {
    /// Newly expanded nodes with their payloads, dependencies first.
    pub order: Vec<(T, N)>,
}

/// Why a resolution failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError<T, E> {
    /// A node depends (directly or transitively) on a node still being resolved.
    ///
    /// The chain is the in-progress path from the node that was re-entered,
    /// followed by that node again.
    Cycle(Vec<T>),
    /// The expansion callback failed for some node.
    Expand(E),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

enum Step<T> {
    Enter(T),
    Exit(T),
}

/// Resolves `root` and its dependency closure.
///
/// * `is_resolved` reports nodes that already exist outside this resolution;
///   they are neither expanded nor returned.
/// * `expand` is called exactly once per newly reached node and returns its
///   payload together with its dependencies, visited in the given order.
///
/// Nothing is committed by this function: on error every payload produced so
/// far is dropped, so callers can treat a resolution as all-or-nothing.
///
/// # Example
///
/// ```rust
/// use chrona_core::graph::resolve_post_order;
///
/// // a -> b -> c
/// let deps = |n: char| match n {
///     'a' => vec!['b'],
///     'b' => vec!['c'],
///     _ => vec![],
/// };
/// let resolution = resolve_post_order('a', |_| false, |n| Ok::<_, ()>(((), deps(n)))).unwrap();
/// let order: Vec<char> = resolution.order.into_iter().map(|(n, _)| n).collect();
/// assert_eq!(order, vec!['c', 'b', 'a']);
/// ```
pub fn resolve_post_order<T, N, E>(
    root: T,
    is_resolved: impl Fn(&T) -> bool,
    mut expand: impl FnMut(T) -> Result<(N, Vec<T>), E>,
) -> Result<Resolution<T, N>, ResolveError<T, E>>
where
    T: Copy + Eq + Hash,
{
    let mut marks: HashMap<T, Mark> = HashMap::new();
    let mut payloads: HashMap<T, N> = HashMap::new();
    let mut path: Vec<T> = Vec::new();
    let mut order: Vec<(T, N)> = Vec::new();
    let mut stack = vec![Step::Enter(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) => {
                if is_resolved(&node) {
                    continue;
                }
                match marks.get(&node) {
                    Some(Mark::Done) => continue,
                    Some(Mark::InProgress) => return Err(cycle_error(&path, node)),
                    None => {}
                }

                let (payload, dependencies) = expand(node).map_err(ResolveError::Expand)?;
                marks.insert(node, Mark::InProgress);
                payloads.insert(node, payload);
                path.push(node);
                stack.push(Step::Exit(node));

                // Reversed so the first declared dependency is visited first.
                for dep in dependencies.into_iter().rev() {
                    if is_resolved(&dep) {
                        continue;
                    }
                    match marks.get(&dep) {
                        Some(Mark::Done) => {}
                        Some(Mark::InProgress) => return Err(cycle_error(&path, dep)),
                        None => stack.push(Step::Enter(dep)),
                    }
                }
            }
            Step::Exit(node) => {
                marks.insert(node, Mark::Done);
                path.pop();
                if let Some(payload) = payloads.remove(&node) {
                    order.push((node, payload));
                }
            }
        }
    }

    Ok(Resolution { order })
}

fn cycle_error<T: Copy + Eq, E>(path: &[T], reentered: T) -> ResolveError<T, E> {
    let start = path.iter().position(|n| *n == reentered).unwrap_or(0);
    let mut chain: Vec<T> = path[start..].to_vec();
    chain.push(reentered);
    ResolveError::Cycle(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn graph(edges: &[(char, &[char])]) -> HashMap<char, Vec<char>> {
        edges.iter().map(|(n, d)| (*n, d.to_vec())).collect()
    }

    fn resolve(
        g: &HashMap<char, Vec<char>>,
        root: char,
        existing: &HashSet<char>,
    ) -> Result<Vec<char>, ResolveError<char, ()>> {
        resolve_post_order(
            root,
            |n| existing.contains(n),
            |n| Ok(((), g.get(&n).cloned().unwrap_or_default())),
        )
        .map(|r| r.order.into_iter().map(|(n, _)| n).collect())
    }

    #[test]
    fn test_linear_chain_is_post_order() {
        let g = graph(&[('a', &['b']), ('b', &['c']), ('c', &[])]);
        let order = resolve(&g, 'a', &HashSet::new()).unwrap();
        assert_eq!(order, vec!['c', 'b', 'a']);
    }

    #[test]
    fn test_diamond_expands_shared_node_once() {
        // a -> {b, c}, b -> d, c -> d
        let g = graph(&[('a', &['b', 'c']), ('b', &['d']), ('c', &['d']), ('d', &[])]);
        let mut expanded = Vec::new();
        let resolution = resolve_post_order(
            'a',
            |_| false,
            |n| {
                expanded.push(n);
                Ok::<_, ()>(((), g[&n].clone()))
            },
        )
        .unwrap();

        let order: Vec<char> = resolution.order.into_iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!['d', 'b', 'c', 'a']);
        assert_eq!(expanded.iter().filter(|n| **n == 'd').count(), 1);
    }

    #[test]
    fn test_declared_order_is_respected() {
        let g = graph(&[('a', &['c', 'b']), ('b', &[]), ('c', &[])]);
        let order = resolve(&g, 'a', &HashSet::new()).unwrap();
        assert_eq!(order, vec!['c', 'b', 'a']);
    }

    #[test]
    fn test_already_resolved_nodes_are_skipped() {
        let g = graph(&[('a', &['b']), ('b', &['c']), ('c', &[])]);
        let existing: HashSet<char> = ['b'].into_iter().collect();
        let order = resolve(&g, 'a', &existing).unwrap();
        assert_eq!(order, vec!['a']);
    }

    #[test]
    fn test_resolved_root_yields_nothing() {
        let g = graph(&[('a', &[])]);
        let existing: HashSet<char> = ['a'].into_iter().collect();
        assert!(resolve(&g, 'a', &existing).unwrap().is_empty());
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let g = graph(&[('a', &['a'])]);
        let err = resolve(&g, 'a', &HashSet::new()).unwrap_err();
        assert_eq!(err, ResolveError::Cycle(vec!['a', 'a']));
    }

    #[test]
    fn test_indirect_cycle_reports_chain() {
        let g = graph(&[('a', &['b']), ('b', &['c']), ('c', &['b'])]);
        let err = resolve(&g, 'a', &HashSet::new()).unwrap_err();
        assert_eq!(err, ResolveError::Cycle(vec!['b', 'c', 'b']));
    }

    #[test]
    fn test_expand_error_is_propagated() {
        let err = resolve_post_order('a', |_| false, |n| {
            if n == 'b' {
                Err("missing")
            } else {
                Ok(((), vec!['b']))
            }
        })
        .unwrap_err();
        assert_eq!(err, ResolveError::Expand("missing"));
    }
}
