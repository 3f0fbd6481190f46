use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use strict_num::FiniteF64;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    activation::Activation,
    config::{NetworkConfig, WeightInitError},
    node::{LayerKind, Node, NodeId, NodePosition},
};

/// The sole owner of every node
///
/// Edges are stored as parent-to-weight entries on the child node and are only reachable through
/// [`NodeId`] lookups into this arena.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    input_layer: Vec<NodeId>,
    hidden_layers: Vec<Vec<NodeId>>,
    output_layer: Vec<NodeId>,
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
}
impl NetworkTopology {
    fn check_rep(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for id in self.layers().flatten() {
            assert!(self.nodes.contains_key(id));
        }
        for node in self.nodes.values() {
            assert!(node.id().get() <= self.next_id);
            for (parent, _) in node.parents() {
                let parent = self.nodes.get(&parent).unwrap();
                assert!(parent.children().contains(&node.id()));
            }
            for child in node.children() {
                let child = self.nodes.get(child).unwrap();
                assert!(child.weight_from(node.id()).is_some());
            }
        }
    }

    fn empty() -> Self {
        Self {
            input_layer: vec![],
            hidden_layers: vec![],
            output_layer: vec![],
            nodes: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Build a fully connected layered topology
    ///
    /// Every node in a layer is connected to every node in the next layer. Without hidden layers
    /// the input layer is connected directly to the output layer.
    pub fn build(config: &NetworkConfig) -> Result<Self, ConstructionError> {
        Self::build_with_rng(config, &mut rand::thread_rng())
    }

    pub fn build_with_rng(
        config: &NetworkConfig,
        rng: &mut impl Rng,
    ) -> Result<Self, ConstructionError> {
        if config.input_count == 0 {
            return Err(ConstructionError::ZeroInputCount);
        }
        if config.output_count == 0 {
            return Err(ConstructionError::ZeroOutputCount);
        }
        if config.hidden_layer_count != 0 && config.hidden_layer_width == 0 {
            return Err(ConstructionError::ZeroHiddenLayerWidth {
                hidden_layer_count: config.hidden_layer_count,
            });
        }
        config.initial_weight.validate()?;

        let mut this = Self::empty();
        let activation = config.activation;
        let input_layer = (0..config.input_count)
            .map(|index| this.create_node(LayerKind::Input, index, activation))
            .collect();
        this.input_layer = input_layer;
        let output_layer = (0..config.output_count)
            .map(|index| this.create_node(LayerKind::Output, index, activation))
            .collect();
        this.output_layer = output_layer;
        for layer in 0..config.hidden_layer_count {
            let nodes = (0..config.hidden_layer_width)
                .map(|index| this.create_node(LayerKind::Hidden(layer), index, activation))
                .collect();
            this.hidden_layers.push(nodes);
        }

        let layers = this.layers().map(<[NodeId]>::to_vec).collect::<Vec<_>>();
        for pair in layers.windows(2) {
            let (parents, children) = (&pair[0], &pair[1]);
            for &child in children {
                for &parent in parents {
                    let weight = config.initial_weight.sample(parents.len(), rng);
                    this.connect(parent, child, weight)?;
                }
            }
        }

        debug!(
            nodes = this.len(),
            edges = this.num_edges(),
            hidden_layers = this.hidden_layers.len(),
            "Built network topology"
        );
        this.check_rep();
        Ok(this)
    }

    /// Strictly increasing, starting at 1
    fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::new(self.next_id)
    }

    fn create_node(&mut self, layer: LayerKind, index: usize, activation: Activation) -> NodeId {
        let id = self.allocate_id();
        let position = NodePosition { layer, index };
        self.nodes.insert(id, Node::new(id, position, activation));
        id
    }

    /// Add the edge `parent -> child`, or overwrite its weight if it exists
    ///
    /// The graph is left unchanged on error.
    pub fn connect(
        &mut self,
        parent: NodeId,
        child: NodeId,
        weight: f64,
    ) -> Result<(), ConnectError> {
        FiniteF64::new(weight).ok_or(ConnectError::NonFiniteWeight(weight))?;
        if !self.nodes.contains_key(&parent) {
            return Err(ConnectError::UnknownNode(parent));
        }
        if !self.nodes.contains_key(&child) {
            return Err(ConnectError::UnknownNode(child));
        }
        if parent == child {
            return Err(ConnectError::SelfLoop(parent));
        }
        // `parent -> child` closes a cycle iff `child` already feeds into `parent`
        if self.is_ancestor(child, parent) {
            return Err(ConnectError::CycleWouldForm { parent, child });
        }

        let child_node = self.nodes.get_mut(&child).ok_or(ConnectError::UnknownNode(child))?;
        let is_new = child_node.set_parent_weight(parent, weight);
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(ConnectError::UnknownNode(parent))?;
        parent_node.add_child(child);
        trace!(%parent, %child, weight, is_new, "Connected");
        self.check_rep();
        Ok(())
    }

    /// Whether `ancestor` is reachable from `node` through parent edges
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(n) = self.nodes.get(&id) else {
                continue;
            };
            for (parent, _) in n.parents() {
                if parent == ancestor {
                    return true;
                }
                if visited.insert(parent) {
                    stack.push(parent);
                }
            }
        }
        false
    }

    pub fn set_bias(&mut self, node: NodeId, bias: f64) -> Result<(), SetBiasError> {
        FiniteF64::new(bias).ok_or(SetBiasError::NonFiniteBias(bias))?;
        let n = self
            .nodes
            .get_mut(&node)
            .ok_or(SetBiasError::UnknownNode(node))?;
        n.set_bias(bias);
        Ok(())
    }

    pub fn set_all_biases(&mut self, bias: f64) -> Result<(), SetBiasError> {
        FiniteF64::new(bias).ok_or(SetBiasError::NonFiniteBias(bias))?;
        self.nodes.values_mut().for_each(|n| n.set_bias(bias));
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }
    /// All nodes in increasing id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn num_edges(&self) -> usize {
        self.nodes.values().map(Node::num_parents).sum()
    }

    pub fn input_layer(&self) -> &[NodeId] {
        &self.input_layer
    }
    pub fn hidden_layers(&self) -> &[Vec<NodeId>] {
        &self.hidden_layers
    }
    pub fn output_layer(&self) -> &[NodeId] {
        &self.output_layer
    }
    /// Input layer, hidden layers in order, then output layer
    pub fn layers(&self) -> impl Iterator<Item = &[NodeId]> + '_ {
        core::iter::once(self.input_layer.as_slice())
            .chain(self.hidden_layers.iter().map(Vec::as_slice))
            .chain(core::iter::once(self.output_layer.as_slice()))
    }
}

#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("The input layer must have at least one node")]
    ZeroInputCount,
    #[error("The output layer must have at least one node")]
    ZeroOutputCount,
    #[error("{hidden_layer_count} hidden layers of zero width would disconnect the network")]
    ZeroHiddenLayerWidth { hidden_layer_count: usize },
    #[error("Invalid initial weight: {0}")]
    WeightInit(#[from] WeightInitError),
    #[error("Failed to connect layers: {0}")]
    Connect(#[from] ConnectError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectError {
    #[error("Node {0} is not owned by the topology")]
    UnknownNode(NodeId),
    #[error("Node {0} cannot be connected to itself")]
    SelfLoop(NodeId),
    #[error("Edge {parent} -> {child} would form a cycle")]
    CycleWouldForm { parent: NodeId, child: NodeId },
    #[error("Weight `{0}` is not finite")]
    NonFiniteWeight(f64),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SetBiasError {
    #[error("Node {0} is not owned by the topology")]
    UnknownNode(NodeId),
    #[error("Bias `{0}` is not finite")]
    NonFiniteBias(f64),
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::config::WeightInit;

    use super::*;

    fn config(
        input_count: usize,
        output_count: usize,
        hidden_layer_count: usize,
        hidden_layer_width: usize,
    ) -> NetworkConfig {
        NetworkConfig {
            input_count,
            output_count,
            hidden_layer_count,
            hidden_layer_width,
            initial_weight: WeightInit::Constant(1.),
            activation: Activation::Identity,
        }
    }

    #[test]
    fn node_count_and_ids() {
        for (i, o, h, w) in [(1, 1, 0, 0), (2, 1, 1, 2), (3, 4, 2, 5), (784, 10, 2, 16)] {
            let topology = NetworkTopology::build(&config(i, o, h, w)).unwrap();
            let n = i + o + h * w;
            assert_eq!(topology.len(), n);
            let ids = topology.nodes().map(|n| n.id().get()).collect::<Vec<u64>>();
            assert_eq!(ids, (1..=n as u64).collect::<Vec<u64>>());
            let in_layers = topology.layers().map(<[NodeId]>::len).sum::<usize>();
            assert_eq!(in_layers, n);
        }
    }

    #[test]
    fn ids_are_allocated_per_instance() {
        let a = NetworkTopology::build(&config(2, 1, 1, 2)).unwrap();
        let b = NetworkTopology::build(&config(2, 1, 1, 2)).unwrap();
        assert_eq!(a.input_layer(), b.input_layer());
        assert_eq!(a.input_layer()[0].get(), 1);
    }

    #[test]
    fn ids_follow_layer_creation_order() {
        let topology = NetworkTopology::build(&config(2, 3, 1, 2)).unwrap();
        let ids = |layer: &[NodeId]| layer.iter().map(NodeId::get).collect::<Vec<u64>>();
        assert_eq!(ids(topology.input_layer()), [1_u64, 2]);
        assert_eq!(ids(topology.output_layer()), [3_u64, 4, 5]);
        assert_eq!(ids(&topology.hidden_layers()[0]), [6_u64, 7]);
    }

    #[test]
    fn fully_bipartite_wiring() {
        let topology = NetworkTopology::build(&config(3, 2, 2, 4)).unwrap();
        assert_eq!(topology.num_edges(), 3 * 4 + 4 * 4 + 4 * 2);
        let layers = topology.layers().collect::<Vec<_>>();
        for pair in layers.windows(2) {
            for &child in pair[1] {
                let child = topology.node(child).unwrap();
                assert_eq!(child.num_parents(), pair[0].len());
                for &parent in pair[0] {
                    assert_eq!(child.weight_from(parent), Some(1.));
                }
            }
            for &parent in pair[0] {
                assert_eq!(topology.node(parent).unwrap().children(), pair[1]);
            }
        }
        for &input in topology.input_layer() {
            assert_eq!(topology.node(input).unwrap().num_parents(), 0);
        }
        for &output in topology.output_layer() {
            assert!(topology.node(output).unwrap().children().is_empty());
        }
    }

    #[test]
    fn zero_hidden_layers_connect_input_to_output() {
        let topology = NetworkTopology::build(&config(3, 2, 0, 7)).unwrap();
        assert_eq!(topology.len(), 5);
        assert!(topology.hidden_layers().is_empty());
        assert_eq!(topology.num_edges(), 6);
        for &output in topology.output_layer() {
            let output = topology.node(output).unwrap();
            let parents = output.parents().map(|(p, _)| p).collect::<Vec<NodeId>>();
            assert_eq!(parents, topology.input_layer());
        }
    }

    #[test]
    fn construction_errors() {
        assert!(matches!(
            NetworkTopology::build(&config(0, 1, 1, 1)),
            Err(ConstructionError::ZeroInputCount)
        ));
        assert!(matches!(
            NetworkTopology::build(&config(1, 0, 1, 1)),
            Err(ConstructionError::ZeroOutputCount)
        ));
        assert!(matches!(
            NetworkTopology::build(&config(1, 1, 2, 0)),
            Err(ConstructionError::ZeroHiddenLayerWidth {
                hidden_layer_count: 2
            })
        ));
        let mut c = config(1, 1, 1, 1);
        c.initial_weight = WeightInit::Constant(f64::INFINITY);
        assert!(matches!(
            NetworkTopology::build(&c),
            Err(ConstructionError::WeightInit(_))
        ));
    }

    #[test]
    fn random_weights_are_reproducible() {
        let mut c = config(4, 2, 1, 3);
        c.initial_weight = WeightInit::Uniform;
        let a = NetworkTopology::build_with_rng(&c, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = NetworkTopology::build_with_rng(&c, &mut StdRng::seed_from_u64(1)).unwrap();
        let weights = |t: &NetworkTopology| {
            t.nodes()
                .flat_map(|n| n.parents().map(|(_, w)| w).collect::<Vec<f64>>())
                .collect::<Vec<f64>>()
        };
        assert_eq!(weights(&a), weights(&b));
        let bound = 1. / 4f64.sqrt();
        for &hidden in &a.hidden_layers()[0] {
            for (_, w) in a.node(hidden).unwrap().parents() {
                assert!(-bound <= w && w < bound);
            }
        }
    }

    #[test]
    fn connect_overwrites_weight() {
        let mut topology = NetworkTopology::build(&config(2, 1, 1, 2)).unwrap();
        let parent = topology.input_layer()[0];
        let child = topology.output_layer()[0];
        topology.connect(parent, child, 0.25).unwrap();
        topology.connect(parent, child, 0.75).unwrap();
        let c = topology.node(child).unwrap();
        assert_eq!(c.num_parents(), 3);
        assert_eq!(c.weight_from(parent), Some(0.75));
        let count = topology
            .node(parent)
            .unwrap()
            .children()
            .iter()
            .filter(|&&c| c == child)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn connect_rejects_self_loop_and_cycle() {
        let mut topology = NetworkTopology::build(&config(1, 1, 2, 1)).unwrap();
        let input = topology.input_layer()[0];
        let output = topology.output_layer()[0];
        let hidden = topology.hidden_layers()[1][0];
        let edges = topology.num_edges();
        assert_eq!(
            topology.connect(hidden, hidden, 1.),
            Err(ConnectError::SelfLoop(hidden))
        );
        assert_eq!(
            topology.connect(output, input, 1.),
            Err(ConnectError::CycleWouldForm {
                parent: output,
                child: input
            })
        );
        assert_eq!(
            topology.connect(hidden, topology.hidden_layers()[0][0], 1.),
            Err(ConnectError::CycleWouldForm {
                parent: hidden,
                child: topology.hidden_layers()[0][0]
            })
        );
        assert_eq!(topology.num_edges(), edges);
        assert!(topology.node(input).unwrap().num_parents() == 0);
        assert!(topology.node(output).unwrap().children().is_empty());
    }

    #[test]
    fn connect_skip_layer() {
        let mut topology = NetworkTopology::build(&config(1, 1, 2, 1)).unwrap();
        let input = topology.input_layer()[0];
        let output = topology.output_layer()[0];
        topology.connect(input, output, 2.).unwrap();
        assert_eq!(topology.node(output).unwrap().weight_from(input), Some(2.));
        assert!(topology.is_ancestor(input, output));
        assert!(!topology.is_ancestor(output, input));
    }

    #[test]
    fn connect_rejects_unknown_and_non_finite() {
        let mut topology = NetworkTopology::build(&config(1, 1, 0, 0)).unwrap();
        let input = topology.input_layer()[0];
        let unknown = NodeId::new(100);
        assert_eq!(
            topology.connect(input, unknown, 1.),
            Err(ConnectError::UnknownNode(unknown))
        );
        assert_eq!(
            topology.connect(unknown, input, 1.),
            Err(ConnectError::UnknownNode(unknown))
        );
        assert!(matches!(
            topology.connect(input, topology.output_layer()[0], f64::NAN),
            Err(ConnectError::NonFiniteWeight(_))
        ));
    }

    #[test]
    fn set_bias() {
        let mut topology = NetworkTopology::build(&config(1, 1, 0, 0)).unwrap();
        let output = topology.output_layer()[0];
        topology.set_bias(output, 0.5).unwrap();
        assert_eq!(topology.node(output).unwrap().bias(), 0.5);
        assert_eq!(
            topology.set_bias(NodeId::new(9), 0.5),
            Err(SetBiasError::UnknownNode(NodeId::new(9)))
        );
        assert!(topology.set_bias(output, f64::NEG_INFINITY).is_err());
        topology.set_all_biases(-1.).unwrap();
        assert!(topology.nodes().all(|n| n.bias() == -1.));
    }
}
