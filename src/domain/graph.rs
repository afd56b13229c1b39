//! Dependency graph for tasks
//!
//! Derived from a [`Registry`]: one node per task, one edge per declared
//! prerequisite. Edges point from a task to its prerequisite and carry the
//! prerequisite's declared position, so traversals can follow declaration
//! order regardless of how petgraph stores adjacency.
//!
//! Uses petgraph for storage and the fast acyclicity check; the cycle path and
//! the execution order come from an explicit depth-first walk.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::error::{Cycle, EngineError};
use super::name::TaskName;
use super::registry::Registry;

/// Traversal mark for depth-first walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// A task dependency graph
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph; edge weight is the declared position
    graph: DiGraph<TaskName, usize>,

    /// Map from task name to node index
    node_map: HashMap<TaskName, NodeIndex>,

    /// Nodes in registration order, used as traversal roots
    roots: Vec<NodeIndex>,
}

impl DependencyGraph {
    /// Builds the graph for every task in the registry
    ///
    /// Fails if a task names a prerequisite that was never registered.
    pub fn from_registry(registry: &Registry) -> Result<Self, EngineError> {
        let mut graph = Self::default();

        // First pass: add all nodes
        for task in registry.iter() {
            let idx = graph.graph.add_node(task.name().clone());
            graph.node_map.insert(task.name().clone(), idx);
            graph.roots.push(idx);
        }

        // Second pass: add all edges
        for task in registry.iter() {
            let task_idx = graph.node_map[task.name()];
            for (position, prerequisite) in task.prerequisites().iter().enumerate() {
                let dep_idx = *graph.node_map.get(prerequisite).ok_or_else(|| {
                    EngineError::UnknownPrerequisite {
                        task: task.name().clone(),
                        prerequisite: prerequisite.to_string(),
                    }
                })?;
                graph.graph.add_edge(task_idx, dep_idx, position);
            }
        }

        Ok(graph)
    }

    /// Checks the whole graph for cycles
    ///
    /// Roots are visited in registration order and prerequisites in declared
    /// order, so the reported cycle is deterministic.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !is_cyclic_directed(&self.graph) {
            return Ok(());
        }

        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        for &root in &self.roots {
            self.walk(root, &mut marks, &mut stack, &mut |_: NodeIndex| {})?;
        }

        Ok(())
    }

    /// Returns the bodies a run of `target` would execute, in order
    ///
    /// This is a post-order depth-first walk: every prerequisite appears
    /// before the tasks depending on it, and each task appears once.
    pub fn execution_order(&self, target: &str) -> Result<Vec<TaskName>, EngineError> {
        let root = self.index_of(target)?;

        let mut order = Vec::new();
        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        self.walk(root, &mut marks, &mut stack, &mut |idx: NodeIndex| {
            order.push(self.graph[idx].clone());
        })?;

        Ok(order)
    }

    /// Depth-first walk from `idx`, calling `on_done` in post-order
    fn walk(
        &self,
        idx: NodeIndex,
        marks: &mut HashMap<NodeIndex, Mark>,
        stack: &mut Vec<NodeIndex>,
        on_done: &mut dyn FnMut(NodeIndex),
    ) -> Result<(), EngineError> {
        match marks.get(&idx) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(self.cycle_error(stack, idx)),
            None => {}
        }

        marks.insert(idx, Mark::Visiting);
        stack.push(idx);

        for dep in self.ordered_prerequisites(idx) {
            self.walk(dep, marks, stack, on_done)?;
        }

        stack.pop();
        marks.insert(idx, Mark::Done);
        on_done(idx);

        Ok(())
    }

    fn cycle_error(&self, stack: &[NodeIndex], repeated: NodeIndex) -> EngineError {
        let start = stack.iter().position(|&i| i == repeated).unwrap_or(0);
        let path = stack[start..]
            .iter()
            .chain(std::iter::once(&repeated))
            .map(|&i| self.graph[i].clone())
            .collect();

        EngineError::CyclicDependency(Cycle::new(path))
    }

    /// Prerequisite nodes of `idx` in declared order
    fn ordered_prerequisites(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        edges.sort_by_key(|(position, _)| *position);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, EngineError> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownTask(name.to_string()))
    }

    /// Returns the direct prerequisites of a task in declared order
    pub fn prerequisites(&self, name: &str) -> Vec<TaskName> {
        match self.node_map.get(name) {
            Some(&idx) => self
                .ordered_prerequisites(idx)
                .into_iter()
                .map(|i| self.graph[i].clone())
                .collect(),
            None => vec![],
        }
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}
