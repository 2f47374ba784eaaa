//! Job dependency graph for one pipeline run.
//!
//! `check:<platform>` jobs are roots, the release `gate` waits on all of
//! them, every `release:<platform>` job waits on the gate, and `publish`
//! waits on every release job.

use kiln_core::Platform;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("Cycle detected in job dependencies")]
    CycleDetected,
    #[error("Unknown job dependency: {0}")]
    UnknownDependency(String),
    #[error("No platforms to schedule")]
    EmptyPipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Check(Platform),
    Gate,
    Release(Platform),
    Publish,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Check(p) => write!(f, "check:{}", p),
            JobKind::Gate => f.write_str("gate"),
            JobKind::Release(p) => write!(f, "release:{}", p),
            JobKind::Publish => f.write_str("publish"),
        }
    }
}

/// A node in the job graph.
#[derive(Debug, Clone)]
pub struct JobNode {
    pub name: String,
    pub kind: JobKind,
}

#[derive(Debug)]
pub struct JobGraph {
    graph: DiGraph<JobNode, ()>,
    name_to_index: HashMap<String, NodeIndex>,
}

impl JobGraph {
    /// Build the check → gate → release → publish graph for `platforms`.
    pub fn build(platforms: &[Platform]) -> Result<Self, DagError> {
        if platforms.is_empty() {
            return Err(DagError::EmptyPipeline);
        }

        let mut jobs: Vec<(JobKind, Vec<JobKind>)> = Vec::new();
        for &p in platforms {
            jobs.push((JobKind::Check(p), vec![]));
        }
        jobs.push((
            JobKind::Gate,
            platforms.iter().map(|&p| JobKind::Check(p)).collect(),
        ));
        for &p in platforms {
            jobs.push((JobKind::Release(p), vec![JobKind::Gate]));
        }
        jobs.push((
            JobKind::Publish,
            platforms.iter().map(|&p| JobKind::Release(p)).collect(),
        ));

        Self::from_jobs(jobs)
    }

    fn from_jobs(jobs: Vec<(JobKind, Vec<JobKind>)>) -> Result<Self, DagError> {
        let mut graph = DiGraph::new();
        let mut name_to_index = HashMap::new();

        for (kind, _) in &jobs {
            let name = kind.to_string();
            let idx = graph.add_node(JobNode {
                name: name.clone(),
                kind: *kind,
            });
            name_to_index.insert(name, idx);
        }

        for (kind, depends_on) in &jobs {
            let job_idx = name_to_index[&kind.to_string()];
            for dep in depends_on {
                let dep_name = dep.to_string();
                let dep_idx = name_to_index
                    .get(&dep_name)
                    .ok_or(DagError::UnknownDependency(dep_name))?;
                graph.add_edge(*dep_idx, job_idx, ());
            }
        }

        let dag = Self {
            graph,
            name_to_index,
        };

        dag.topological_order()?;

        Ok(dag)
    }

    /// Jobs that must finish before `name` may start.
    pub fn predecessors(&self, name: &str) -> Vec<&JobNode> {
        self.name_to_index
            .get(name)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .filter_map(|n| self.graph.node_weight(n))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn topological_order(&self) -> Result<Vec<&JobNode>, DagError> {
        toposort(&self.graph, None)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx))
                    .collect()
            })
            .map_err(|_| DagError::CycleDetected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[&JobNode], name: &str) -> usize {
        order.iter().position(|n| n.name == name).unwrap()
    }

    fn names(nodes: Vec<&JobNode>) -> Vec<String> {
        let mut names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_pipeline_shape() {
        let dag = JobGraph::build(&Platform::ALL).unwrap();

        assert_eq!(dag.topological_order().unwrap().len(), 8);
        for p in Platform::ALL {
            assert!(dag.predecessors(&format!("check:{}", p)).is_empty());
            assert_eq!(names(dag.predecessors(&format!("release:{}", p))), vec!["gate"]);
        }
        assert_eq!(
            names(dag.predecessors("gate")),
            vec!["check:linux", "check:macos", "check:windows"]
        );
        assert_eq!(
            names(dag.predecessors("publish")),
            vec!["release:linux", "release:macos", "release:windows"]
        );
        assert!(dag.predecessors("deploy").is_empty());
    }

    #[test]
    fn test_release_waits_for_every_check() {
        let dag = JobGraph::build(&Platform::ALL).unwrap();
        let order = dag.topological_order().unwrap();

        let gate = position(&order, "gate");
        for p in Platform::ALL {
            assert!(position(&order, &format!("check:{}", p)) < gate);
            assert!(gate < position(&order, &format!("release:{}", p)));
        }
        assert_eq!(order.last().unwrap().kind, JobKind::Publish);
    }

    #[test]
    fn test_empty_platforms_rejected() {
        assert!(matches!(JobGraph::build(&[]), Err(DagError::EmptyPipeline)));
    }

    #[test]
    fn test_cycle_detected() {
        let jobs = vec![
            (JobKind::Gate, vec![JobKind::Publish]),
            (JobKind::Publish, vec![JobKind::Gate]),
        ];
        assert!(matches!(
            JobGraph::from_jobs(jobs),
            Err(DagError::CycleDetected)
        ));
    }

    #[test]
    fn test_unknown_dependency() {
        let jobs = vec![(JobKind::Gate, vec![JobKind::Check(Platform::Linux)])];
        assert!(matches!(
            JobGraph::from_jobs(jobs),
            Err(DagError::UnknownDependency(_))
        ));
    }
}
