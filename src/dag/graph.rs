// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::dag::batch::Batch;
use crate::job::JobName;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Jobs that must be submitted before this one.
    deps: Vec<JobName>,
    /// Jobs that wait for this one.
    dependents: Vec<JobName>,
}

/// Adjacency view of a batch keyed by job name.
///
/// Nothing here assumes acyclicity; cycles are only looked for once the
/// scheduler stops making progress.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<JobName, DagNode>,
}

impl DagGraph {
    pub fn from_batch(batch: &Batch) -> Self {
        let mut nodes: HashMap<JobName, DagNode> = batch
            .jobs()
            .iter()
            .map(|job| {
                (
                    job.name().to_string(),
                    DagNode {
                        deps: job.dependencies().to_vec(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for job in batch.jobs() {
            for dep in job.dependencies() {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(job.name().to_string());
                }
            }
        }

        Self { nodes }
    }

    /// Immediate dependencies of a job.
    pub fn dependencies_of(&self, name: &str) -> &[JobName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a job.
    pub fn dependents_of(&self, name: &str) -> &[JobName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Every job reachable from `name` through dependent edges, excluding
    /// `name` itself.
    pub fn transitive_dependents(&self, name: &str) -> Vec<JobName> {
        let mut stack: Vec<&str> = self.dependents_of(name).iter().map(String::as_str).collect();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();

        while let Some(next) = stack.pop() {
            if next == name || !visited.insert(next) {
                continue;
            }
            out.push(next.to_string());
            stack.extend(self.dependents_of(next).iter().map(String::as_str));
        }

        out
    }

    /// Dependency cycles among `subset`, each as a sorted list of names.
    ///
    /// A cycle is a strongly connected component with more than one job, or a
    /// single job depending on itself.
    pub fn cycles_among(&self, subset: &[JobName]) -> Vec<Vec<JobName>> {
        let members: HashSet<&str> = subset.iter().map(String::as_str).collect();

        // Edge direction: dep -> job.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for &name in &members {
            graph.add_node(name);
        }
        for &name in &members {
            for dep in self.dependencies_of(name) {
                if members.contains(dep.as_str()) {
                    graph.add_edge(dep.as_str(), name, ());
                }
            }
        }

        let mut cycles: Vec<Vec<JobName>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<JobName> = scc.into_iter().map(str::to_string).collect();
                names.sort();
                names
            })
            .collect();

        cycles.sort();
        cycles
    }
}
