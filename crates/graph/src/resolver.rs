//! Priority-aware topological ordering with cycle and blocker reports.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use agentboard_core::{Feature, FeatureId};

/// Result of resolving a feature snapshot.
#[derive(Debug, Clone, Default)]
pub struct DependencyReport {
    /// All feature ids, dependencies-first. Mutually independent features
    /// appear in priority order (ties keep input order). Features caught in
    /// a cycle are appended at the end so nothing is dropped; `cycles`
    /// flags them as unordered.
    pub order: Vec<FeatureId>,

    /// Each detected cycle, as the path slice that closed it.
    pub cycles: Vec<Vec<FeatureId>>,

    /// Per feature: declared dependency ids with no matching feature in the
    /// snapshot. Missing dependencies are reported, never blocking.
    pub missing: HashMap<FeatureId, Vec<FeatureId>>,

    /// Per feature: dependency ids that exist but are not yet completed or
    /// verified. Computed independently of cycle membership.
    pub blocked: HashMap<FeatureId, Vec<FeatureId>>,
}

impl DependencyReport {
    /// Whether the feature has at least one incomplete existing dependency.
    pub fn is_blocked(&self, id: FeatureId) -> bool {
        self.blocked.get(&id).is_some_and(|deps| !deps.is_empty())
    }

    /// Whether the feature participates in a dependency cycle.
    pub fn in_cycle(&self, id: FeatureId) -> bool {
        self.cycles.iter().any(|cycle| cycle.contains(&id))
    }
}

/// Resolve a feature snapshot into a priority-aware topological order plus
/// cycle, missing-dependency, and blocking-dependency reports.
///
/// Kahn's algorithm with a priority-ordered ready set: the ready set is a
/// min-heap keyed on `(priority, input position)`, so the output order is
/// determined by priority, not just reachability. Duplicate dependency ids
/// within one feature are treated as a set.
pub fn resolve(features: &[Feature]) -> DependencyReport {
    let index: HashMap<FeatureId, usize> = features
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id, i))
        .collect();

    // Deduplicated dependency edges, split into existing and missing.
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); features.len()];
    let mut report = DependencyReport::default();

    for (i, feature) in features.iter().enumerate() {
        let mut seen = HashSet::new();
        for &dep_id in &feature.dependencies {
            if !seen.insert(dep_id) {
                continue;
            }
            match index.get(&dep_id) {
                Some(&dep_idx) => {
                    deps[i].push(dep_idx);
                    if !features[dep_idx].status.satisfies_dependents() {
                        report.blocked.entry(feature.id).or_default().push(dep_id);
                    }
                }
                None => {
                    report.missing.entry(feature.id).or_default().push(dep_id);
                }
            }
        }
    }

    // dependency -> dependents, over existing edges only.
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); features.len()];
    let mut in_degree: Vec<usize> = vec![0; features.len()];
    for (i, feature_deps) in deps.iter().enumerate() {
        in_degree[i] = feature_deps.len();
        for &dep_idx in feature_deps {
            dependents[dep_idx].push(i);
        }
    }

    // Ready set ordered by (priority, input position): lowest priority
    // number first, input order on ties.
    let mut ready: BinaryHeap<Reverse<(u8, usize)>> = features
        .iter()
        .enumerate()
        .filter(|(i, _)| in_degree[*i] == 0)
        .map(|(i, f)| Reverse((f.priority.level(), i)))
        .collect();

    let mut placed = vec![false; features.len()];
    while let Some(Reverse((_, i))) = ready.pop() {
        placed[i] = true;
        report.order.push(features[i].id);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse((features[dependent].priority.level(), dependent)));
            }
        }
    }

    // Whatever never reached zero in-degree sits on or behind a cycle.
    let leftover: Vec<usize> = (0..features.len()).filter(|&i| !placed[i]).collect();
    if !leftover.is_empty() {
        report.cycles = find_cycles(features, &deps, &leftover);
        for &i in &leftover {
            report.order.push(features[i].id);
        }
    }

    report
}

/// DFS over the unplaced subgraph, reporting each path slice that closes a
/// cycle. A feature depending on itself is a 1-element cycle.
fn find_cycles(features: &[Feature], deps: &[Vec<usize>], leftover: &[usize]) -> Vec<Vec<FeatureId>> {
    let mut walk = CycleWalk {
        leftover: leftover.iter().copied().collect(),
        visited: HashSet::new(),
        on_stack: HashSet::new(),
        path: Vec::new(),
        cycles: Vec::new(),
    };

    for &start in leftover {
        if !walk.visited.contains(&start) {
            walk.visit(start, deps);
        }
    }

    walk.cycles
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|n| features[n].id).collect())
        .collect()
}

struct CycleWalk {
    leftover: HashSet<usize>,
    visited: HashSet<usize>,
    on_stack: HashSet<usize>,
    path: Vec<usize>,
    cycles: Vec<Vec<usize>>,
}

impl CycleWalk {
    fn visit(&mut self, node: usize, deps: &[Vec<usize>]) {
        self.visited.insert(node);
        self.on_stack.insert(node);
        self.path.push(node);

        for &dep in &deps[node] {
            if !self.leftover.contains(&dep) {
                // Placed features are acyclic by construction.
                continue;
            }
            if self.on_stack.contains(&dep) {
                let cycle_start = self.path.iter().position(|&n| n == dep).unwrap_or(0);
                self.cycles.push(self.path[cycle_start..].to_vec());
            } else if !self.visited.contains(&dep) {
                self.visit(dep, deps);
            }
        }

        self.path.pop();
        self.on_stack.remove(&node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentboard_core::{FeatureStatus, Priority};

    fn feature(title: &str, priority: Priority, deps: Vec<FeatureId>) -> Feature {
        let mut f = Feature::new(title, "test feature").with_priority(priority);
        f.dependencies = deps;
        f
    }

    fn position(report: &DependencyReport, id: FeatureId) -> usize {
        report.order.iter().position(|&x| x == id).unwrap()
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = resolve(&[]);
        assert!(report.order.is_empty());
        assert!(report.cycles.is_empty());
        assert!(report.missing.is_empty());
        assert!(report.blocked.is_empty());
    }

    #[test]
    fn dependencies_precede_dependents() {
        let a = feature("a", Priority::NORMAL, vec![]);
        let b = feature("b", Priority::NORMAL, vec![a.id]);
        let c = feature("c", Priority::NORMAL, vec![b.id]);

        let report = resolve(&[c.clone(), b.clone(), a.clone()]);

        assert!(position(&report, a.id) < position(&report, b.id));
        assert!(position(&report, b.id) < position(&report, c.id));
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn independent_features_come_out_in_priority_order() {
        let low = feature("low", Priority::LOW, vec![]);
        let high = feature("high", Priority::HIGH, vec![]);
        let normal = feature("normal", Priority::NORMAL, vec![]);

        let report = resolve(&[low.clone(), normal.clone(), high.clone()]);

        assert_eq!(report.order, vec![high.id, normal.id, low.id]);
    }

    #[test]
    fn equal_priority_keeps_input_order() {
        let first = feature("first", Priority::NORMAL, vec![]);
        let second = feature("second", Priority::NORMAL, vec![]);
        let third = feature("third", Priority::NORMAL, vec![]);

        let report = resolve(&[first.clone(), second.clone(), third.clone()]);

        assert_eq!(report.order, vec![first.id, second.id, third.id]);
    }

    #[test]
    fn readiness_and_priority_interleave() {
        // Feature 1: priority 2, no deps. Feature 2: priority 1, depends on
        // 1. Feature 3: priority 1, no deps. Both 1 and 3 are ready at the
        // start; 3 wins on priority, then 1, then 2 becomes ready.
        let f1 = feature("one", Priority::NORMAL, vec![]);
        let f2 = feature("two", Priority::HIGH, vec![f1.id]);
        let f3 = feature("three", Priority::HIGH, vec![]);

        let report = resolve(&[f1.clone(), f2.clone(), f3.clone()]);

        assert_eq!(report.order, vec![f3.id, f1.id, f2.id]);
    }

    #[test]
    fn self_dependency_is_a_one_element_cycle() {
        let mut f = feature("selfish", Priority::NORMAL, vec![]);
        f.dependencies = vec![f.id];

        let report = resolve(&[f.clone()]);

        assert_eq!(report.order, vec![f.id]);
        assert_eq!(report.cycles, vec![vec![f.id]]);
    }

    #[test]
    fn cycle_members_are_appended_not_dropped() {
        let mut a = feature("a", Priority::NORMAL, vec![]);
        let mut b = feature("b", Priority::NORMAL, vec![]);
        a.dependencies = vec![b.id];
        b.dependencies = vec![a.id];
        let free = feature("free", Priority::LOW, vec![]);

        let report = resolve(&[a.clone(), b.clone(), free.clone()]);

        assert_eq!(report.order.len(), 3);
        assert_eq!(report.order[0], free.id);
        assert_eq!(report.cycles.len(), 1);
        assert!(report.in_cycle(a.id));
        assert!(report.in_cycle(b.id));
        assert!(!report.in_cycle(free.id));
    }

    #[test]
    fn cycle_does_not_disturb_outside_order() {
        let x = feature("x", Priority::NORMAL, vec![]);
        let y = feature("y", Priority::NORMAL, vec![x.id]);
        let z = feature("z", Priority::NORMAL, vec![y.id]);

        let without_cycle = resolve(&[x.clone(), y.clone(), z.clone()]);

        let mut c1 = feature("c1", Priority::HIGH, vec![]);
        let mut c2 = feature("c2", Priority::HIGH, vec![]);
        c1.dependencies = vec![c2.id];
        c2.dependencies = vec![c1.id];

        let with_cycle = resolve(&[x.clone(), y.clone(), z.clone(), c1, c2]);

        let outside = |report: &DependencyReport| {
            report
                .order
                .iter()
                .filter(|id| [x.id, y.id, z.id].contains(id))
                .copied()
                .collect::<Vec<_>>()
        };
        assert_eq!(outside(&without_cycle), outside(&with_cycle));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let root = feature("root", Priority::NORMAL, vec![]);
        let left = feature("left", Priority::NORMAL, vec![root.id]);
        let right = feature("right", Priority::NORMAL, vec![root.id]);
        let tip = feature("tip", Priority::NORMAL, vec![left.id, right.id]);

        let report = resolve(&[tip.clone(), left, right, root.clone()]);

        assert!(report.cycles.is_empty());
        assert_eq!(report.order.first(), Some(&root.id));
        assert_eq!(report.order.last(), Some(&tip.id));
    }

    #[test]
    fn duplicate_dependency_ids_are_treated_as_a_set() {
        let a = feature("a", Priority::NORMAL, vec![]);
        let b = feature("b", Priority::NORMAL, vec![a.id, a.id, a.id]);

        let report = resolve(&[b.clone(), a.clone()]);

        assert_eq!(report.order, vec![a.id, b.id]);
        assert!(report.cycles.is_empty());
        assert_eq!(report.blocked.get(&b.id).map(Vec::len), Some(1));
    }

    #[test]
    fn missing_dependency_is_reported_but_never_blocks() {
        let ghost = FeatureId::new();
        let f = feature("f", Priority::NORMAL, vec![ghost]);

        let report = resolve(&[f.clone()]);

        assert_eq!(report.order, vec![f.id]);
        assert_eq!(report.missing.get(&f.id), Some(&vec![ghost]));
        assert!(!report.is_blocked(f.id));
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn blocked_is_computed_independently_of_cycles() {
        let mut done = feature("done", Priority::NORMAL, vec![]);
        done.status = FeatureStatus::Completed;
        let mut verified = feature("verified", Priority::NORMAL, vec![]);
        verified.status = FeatureStatus::Verified;
        let open = feature("open", Priority::NORMAL, vec![]);

        let dependent = feature(
            "dependent",
            Priority::NORMAL,
            vec![done.id, verified.id, open.id],
        );

        let report = resolve(&[done, verified, open.clone(), dependent.clone()]);

        assert!(report.cycles.is_empty());
        assert_eq!(report.blocked.get(&dependent.id), Some(&vec![open.id]));
        assert!(report.is_blocked(dependent.id));
    }

    #[test]
    fn longer_cycle_is_reported_as_one_path() {
        let mut a = feature("a", Priority::NORMAL, vec![]);
        let mut b = feature("b", Priority::NORMAL, vec![]);
        let mut c = feature("c", Priority::NORMAL, vec![]);
        a.dependencies = vec![c.id];
        b.dependencies = vec![a.id];
        c.dependencies = vec![b.id];

        let report = resolve(&[a.clone(), b.clone(), c.clone()]);

        assert_eq!(report.cycles.len(), 1);
        let cycle: HashSet<_> = report.cycles[0].iter().copied().collect();
        assert_eq!(cycle, HashSet::from([a.id, b.id, c.id]));
    }
}
