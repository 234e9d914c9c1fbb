//! Deterministic topological ordering with cycle detection.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Kahn's algorithm with ties broken by ASCII order of the node name, so the
/// same dependency graph always yields the same emission order.
pub fn topological_order(
    nodes: &[String],
    edges: &[(String, String)],
) -> Result<Vec<String>, Vec<String>> {
    let mut children_by_parent: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut indegree: BTreeMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();

    for (parent, child) in edges {
        if !indegree.contains_key(parent.as_str()) || !indegree.contains_key(child.as_str()) {
            continue;
        }
        if parent == child {
            continue;
        }
        let inserted = children_by_parent
            .entry(parent.as_str())
            .or_default()
            .insert(child.as_str());
        if inserted {
            *indegree.get_mut(child.as_str()).unwrap() += 1;
        }
    }

    let mut ready: VecDeque<&str> = VecDeque::new();
    let mut remaining = indegree.clone();
    for name in nodes.iter().map(String::as_str).collect::<BTreeSet<_>>() {
        if remaining[name] == 0 {
            ready.push_back(name);
        }
    }

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(next) = pop_lowest(&mut ready) {
        order.push(next.to_string());
        if let Some(children) = children_by_parent.get(next) {
            for child in children {
                let entry = remaining.get_mut(child).unwrap();
                *entry -= 1;
                if *entry == 0 {
                    ready.push_back(child);
                }
            }
        }
    }

    if order.len() == nodes.len() {
        Ok(order)
    } else {
        let emitted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let cyclic: Vec<String> = remaining
            .keys()
            .filter(|name| !emitted.contains(*name))
            .map(|name| name.to_string())
            .collect();
        Err(cyclic)
    }
}

fn pop_lowest<'a>(ready: &mut VecDeque<&'a str>) -> Option<&'a str> {
    if ready.is_empty() {
        return None;
    }
    let (index, _) = ready.iter().enumerate().min_by_key(|(_, name)| **name)?;
    ready.remove(index)
}
