//! Task dependency graph.
//!
//! Dependencies are fixed when the project plan is loaded, so the graph is
//! built once and only read afterwards. Edges point from a dependency to the
//! task that needs it.

use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

pub struct TaskDAG {
    /// Nodes are task ids; an edge `a -> b` means `b` depends on `a`.
    graph: DiGraph<TaskId, ()>,
    /// Index mapping from TaskId to NodeIndex for fast lookups.
    task_index: HashMap<TaskId, NodeIndex>,
}

impl TaskDAG {
    /// Build the graph for a set of tasks.
    ///
    /// # Errors
    /// - `UnknownDependency` if a task names a dependency that does not exist
    /// - `DependencyCycle` if the dependencies are not acyclic
    pub fn build<'a, I>(tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let mut graph = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut task_index = HashMap::with_capacity(tasks.len());

        // Sorted insertion keeps node order, and therefore tie-breaking, stable.
        let mut ids: Vec<&TaskId> = tasks.iter().map(|t| &t.id).collect();
        ids.sort();
        for id in ids {
            let index = graph.add_node(id.clone());
            task_index.insert(id.clone(), index);
        }

        for task in &tasks {
            let to = task_index[&task.id];
            for dep in &task.dependencies {
                let from = task_index.get(dep).ok_or_else(|| Error::UnknownDependency {
                    task: task.id.to_string(),
                    dependency: dep.to_string(),
                })?;
                graph.add_edge(*from, to, ());
            }
        }

        let dag = Self { graph, task_index };
        if is_cyclic_directed(&dag.graph) {
            let at = toposort(&dag.graph, None)
                .err()
                .and_then(|cycle| dag.graph.node_weight(cycle.node_id()).cloned())
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(Error::DependencyCycle(at));
        }

        Ok(dag)
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_task(&self, id: &str) -> bool {
        self.task_index.contains_key(id)
    }

    /// Tasks that depend directly on `id`.
    pub fn dependents(&self, id: &str) -> Vec<&TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Tasks that `id` depends on directly.
    pub fn dependencies(&self, id: &str) -> Vec<&TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&TaskId> {
        match self.task_index.get(id) {
            Some(&index) => {
                let mut out: Vec<&TaskId> = self
                    .graph
                    .neighbors_directed(index, direction)
                    .filter_map(|n| self.graph.node_weight(n))
                    .collect();
                out.sort();
                out
            }
            None => Vec::new(),
        }
    }

    /// Tasks that no other task lists as a dependency.
    pub fn terminal_tasks(&self) -> Vec<&TaskId> {
        self.graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .filter_map(|n| self.graph.node_weight(n))
            .collect()
    }

    /// Every `(dependency, dependent)` pair.
    pub fn edges(&self) -> Vec<(&TaskId, &TaskId)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .filter_map(|(a, b)| Some((self.graph.node_weight(a)?, self.graph.node_weight(b)?)))
            .collect()
    }

    /// Walk the graph depth first from every terminal task.
    ///
    /// Dependencies are visited before the task itself and each task is
    /// visited once. A task's path length is the longest length among its
    /// dependencies plus its own hours. Ties between chains go to the
    /// smaller task id.
    pub fn critical_walk<F>(&self, hours: F) -> CriticalWalk
    where
        F: Fn(&TaskId) -> f64,
    {
        let mut walk = Walk {
            memo: HashMap::new(),
            visiting: HashSet::new(),
            order: Vec::new(),
        };

        let mut best: Option<(f64, NodeIndex)> = None;
        for terminal in self.graph.node_indices().filter(|&n| {
            self.graph
                .neighbors_directed(n, Direction::Outgoing)
                .next()
                .is_none()
        }) {
            let len = self.visit(terminal, &hours, &mut walk);
            if best.map_or(true, |(b, _)| len > b) {
                best = Some((len, terminal));
            }
        }

        let mut longest = Vec::new();
        let mut cursor = best.map(|(_, n)| n);
        while let Some(node) = cursor {
            longest.push(self.graph[node].clone());
            cursor = walk.memo.get(&node).and_then(|(_, pred)| *pred);
        }
        longest.reverse();

        CriticalWalk {
            visited: walk.order.iter().map(|&n| self.graph[n].clone()).collect(),
            longest,
            hours: best.map_or(0.0, |(len, _)| len),
        }
    }

    fn visit<F>(&self, node: NodeIndex, hours: &F, walk: &mut Walk) -> f64
    where
        F: Fn(&TaskId) -> f64,
    {
        if let Some((len, _)) = walk.memo.get(&node) {
            return *len;
        }
        // Graph is validated acyclic; guard anyway so a bad edge can't recurse forever.
        if !walk.visiting.insert(node) {
            return 0.0;
        }

        let mut preds: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        preds.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));

        let mut best: Option<(f64, NodeIndex)> = None;
        for pred in preds {
            let len = self.visit(pred, hours, walk);
            if best.map_or(true, |(b, _)| len > b) {
                best = Some((len, pred));
            }
        }

        let len = best.map_or(0.0, |(b, _)| b) + hours(&self.graph[node]);
        walk.memo.insert(node, (len, best.map(|(_, n)| n)));
        walk.order.push(node);
        walk.visiting.remove(&node);
        len
    }
}

/// Outcome of [`TaskDAG::critical_walk`].
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalWalk {
    /// Every task reached from a terminal, dependencies before dependents.
    pub visited: Vec<TaskId>,
    /// Longest chain by cumulative hours, dependency first.
    pub longest: Vec<TaskId>,
    /// Length of `longest` in hours.
    pub hours: f64,
}

struct Walk {
    memo: HashMap<NodeIndex, (f64, Option<NodeIndex>)>,
    visiting: HashSet<NodeIndex>,
    order: Vec<NodeIndex>,
}

impl std::fmt::Debug for TaskDAG {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDAG")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
