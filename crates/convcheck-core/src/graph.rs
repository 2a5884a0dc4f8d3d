//! Graph manipulation and validation utilities.
//!
//! Converters build [`ModelGraph`]s node by node and wire edges from tensor
//! names; providers consume them in topological order.

use crate::types::{GraphEdge, GraphNode, ModelGraph, NodeId};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

impl ModelGraph {
    /// Create a new empty model graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a node to the graph, returning the id assigned to it.
    pub fn add_node(&mut self, mut node: GraphNode) -> NodeId {
        let node_id = self.nodes.len();
        node.id = node_id;
        self.nodes.push(node);
        node_id
    }

    /// Add an edge to the graph.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
        if edge.from_node >= self.nodes.len() || edge.to_node >= self.nodes.len() {
            return Err(anyhow!("Edge references non-existent nodes"));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Get a node by ID.
    pub fn get_node(&self, node_id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(node_id)
    }

    /// Get all nodes in the graph.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Get the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Find nodes by operation type.
    pub fn find_nodes_by_op(&self, op_type: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.op_type == op_type)
            .map(|node| node.id)
            .collect()
    }

    /// Get all edges connected to a node as `(incoming, outgoing)`.
    pub fn get_node_edges(&self, node_id: NodeId) -> (Vec<&GraphEdge>, Vec<&GraphEdge>) {
        let incoming = self
            .edges
            .iter()
            .filter(|edge| edge.to_node == node_id)
            .collect();
        let outgoing = self
            .edges
            .iter()
            .filter(|edge| edge.from_node == node_id)
            .collect();
        (incoming, outgoing)
    }

    /// Rebuild `edges` from the tensor names nodes consume and produce.
    pub fn connect_by_tensor_names(&mut self) -> Result<()> {
        let mut producers: HashMap<&str, NodeId> = HashMap::new();
        for node in &self.nodes {
            for output in &node.outputs {
                if producers.insert(output.as_str(), node.id).is_some() {
                    return Err(anyhow!("Tensor '{}' is produced more than once", output));
                }
            }
        }

        let mut edges = Vec::new();
        for node in &self.nodes {
            for input in &node.inputs {
                if let Some(&from_node) = producers.get(input.as_str()) {
                    edges.push(GraphEdge {
                        from_node,
                        to_node: node.id,
                        tensor_name: input.clone(),
                    });
                }
            }
        }
        self.edges = edges;
        Ok(())
    }

    /// Validate the graph structure.
    pub fn validate(&self) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id != index {
                return Err(anyhow!(
                    "Node at position {} carries id {}",
                    index,
                    node.id
                ));
            }
        }

        for edge in &self.edges {
            if edge.from_node >= self.nodes.len() {
                return Err(anyhow!(
                    "Edge references non-existent from_node: {}",
                    edge.from_node
                ));
            }
            if edge.to_node >= self.nodes.len() {
                return Err(anyhow!(
                    "Edge references non-existent to_node: {}",
                    edge.to_node
                ));
            }
        }

        if self.has_cycles() {
            return Err(anyhow!("Graph contains cycles"));
        }

        self.validate_input_output_tensors()
    }

    fn has_cycles(&self) -> bool {
        let mut state = vec![NodeState::Unvisited; self.nodes.len()];
        (0..self.nodes.len()).any(|node_id| {
            state[node_id] == NodeState::Unvisited && self.has_cycles_dfs(node_id, &mut state)
        })
    }

    fn has_cycles_dfs(&self, node_id: NodeId, state: &mut [NodeState]) -> bool {
        state[node_id] = NodeState::Visiting;

        let (_, outgoing) = self.get_node_edges(node_id);
        for edge in outgoing {
            match state[edge.to_node] {
                NodeState::Visiting => return true,
                NodeState::Unvisited => {
                    if self.has_cycles_dfs(edge.to_node, state) {
                        return true;
                    }
                }
                NodeState::Visited => {}
            }
        }

        state[node_id] = NodeState::Visited;
        false
    }

    /// Every node input must be a graph input or another node's output, and
    /// every graph output must be produced by a node or be a graph input.
    fn validate_input_output_tensors(&self) -> Result<()> {
        let graph_inputs: HashSet<&str> = self.inputs.iter().map(|t| t.name.as_str()).collect();
        let produced: HashSet<&str> = self
            .nodes
            .iter()
            .flat_map(|node| node.outputs.iter().map(String::as_str))
            .collect();

        for node in &self.nodes {
            for input in &node.inputs {
                if !graph_inputs.contains(input.as_str()) && !produced.contains(input.as_str()) {
                    return Err(anyhow!(
                        "Node '{}' consumes unknown tensor '{}'",
                        node.name.as_deref().unwrap_or(&node.op_type),
                        input
                    ));
                }
            }
        }

        for output in &self.outputs {
            if !produced.contains(output.name.as_str())
                && !graph_inputs.contains(output.name.as_str())
            {
                return Err(anyhow!(
                    "Graph output '{}' is not produced by any node",
                    output.name
                ));
            }
        }

        Ok(())
    }

    /// Get topological ordering of nodes.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>> {
        let mut in_degree = vec![0; self.nodes.len()];
        for edge in &self.edges {
            in_degree[edge.to_node] += 1;
        }

        let mut queue: VecDeque<NodeId> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(node_id, _)| node_id)
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            let (_, outgoing) = self.get_node_edges(node_id);
            for edge in outgoing {
                in_degree[edge.to_node] -= 1;
                if in_degree[edge.to_node] == 0 {
                    queue.push_back(edge.to_node);
                }
            }
        }

        if result.len() != self.nodes.len() {
            return Err(anyhow!(
                "Graph contains cycles - cannot perform topological sort"
            ));
        }

        Ok(result)
    }

    /// Operator types in topological order.
    pub fn op_sequence(&self) -> Result<Vec<String>> {
        Ok(self
            .topological_sort()?
            .into_iter()
            .map(|node_id| self.nodes[node_id].op_type.clone())
            .collect())
    }

    /// Count nodes by operation type.
    pub fn count_ops(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.op_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Get graph statistics.
    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            op_counts: self.count_ops(),
            input_count: self.inputs.len(),
            output_count: self.outputs.len(),
        }
    }
}

impl Default for ModelGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Unvisited,
    Visiting,
    Visited,
}

/// Graph statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
    /// Total number of nodes.
    pub node_count: usize,
    /// Total number of edges.
    pub edge_count: usize,
    /// Count of each operation type.
    pub op_counts: BTreeMap<String, usize>,
    /// Number of graph inputs.
    pub input_count: usize,
    /// Number of graph outputs.
    pub output_count: usize,
}
