use std::collections::HashMap;

use thiserror::Error;

use crate::{node::NodeId, topology::NetworkTopology};

/// A forward order of every node the destinations depend on
///
/// Computed once and reusable across evaluation passes as long as no edge is added.
#[derive(Debug, Clone)]
pub struct GraphOrder {
    destinations: Vec<NodeId>,
    forward: Vec<NodeId>,
    /// Edge count of the topology the order was computed from
    num_edges: usize,
}
impl GraphOrder {
    pub fn new(topology: &NetworkTopology, destinations: Vec<NodeId>) -> Result<Self, OrderError> {
        let forward = dependency_order(topology, &destinations)?;
        Ok(Self {
            destinations,
            forward,
            num_edges: topology.num_edges(),
        })
    }

    /// Edges are never removed, so an unchanged count means no edge was added
    pub fn is_current(&self, topology: &NetworkTopology) -> bool {
        self.num_edges == topology.num_edges()
    }

    pub fn destinations(&self) -> &[NodeId] {
        &self.destinations
    }
    /// Every node appears after all of its parents
    pub fn forward(&self) -> &[NodeId] {
        &self.forward
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path
    Visiting,
    Done,
}

/// Topological order of the ancestors of `destinations`, destinations included
///
/// Each node appears exactly once no matter how many paths lead to it.
pub fn dependency_order(
    topology: &NetworkTopology,
    destinations: &[NodeId],
) -> Result<Vec<NodeId>, OrderError> {
    let mut marks: HashMap<NodeId, Mark> = HashMap::new();
    let mut forward = vec![];
    // (node, index of the next parent to visit)
    let mut stack: Vec<(NodeId, usize)> = vec![];

    for &destination in destinations {
        if !topology.contains(destination) {
            return Err(OrderError::UnknownNode(destination));
        }
        if marks.contains_key(&destination) {
            continue;
        }
        marks.insert(destination, Mark::Visiting);
        stack.push((destination, 0));

        while let Some((id, next_parent)) = stack.last().copied() {
            let node = topology.node(id).ok_or(OrderError::UnknownNode(id))?;
            let Some((parent, _)) = node.parents().nth(next_parent) else {
                stack.pop();
                marks.insert(id, Mark::Done);
                forward.push(id);
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            match marks.get(&parent).copied() {
                Some(Mark::Done) => (),
                Some(Mark::Visiting) => return Err(OrderError::CycleDetected(parent)),
                None => {
                    if !topology.contains(parent) {
                        return Err(OrderError::UnknownNode(parent));
                    }
                    marks.insert(parent, Mark::Visiting);
                    stack.push((parent, 0));
                }
            }
        }
    }
    Ok(forward)
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Node {0} is not owned by the topology")]
    UnknownNode(NodeId),
    #[error("Cycle detected through node {0}")]
    CycleDetected(NodeId),
}

#[cfg(test)]
mod tests {
    use crate::{
        activation::Activation,
        config::{NetworkConfig, WeightInit},
    };

    use super::*;

    fn topology(hidden_layer_count: usize, hidden_layer_width: usize) -> NetworkTopology {
        let config = NetworkConfig {
            input_count: 2,
            output_count: 2,
            hidden_layer_count,
            hidden_layer_width,
            initial_weight: WeightInit::Constant(1.),
            activation: Activation::Identity,
        };
        NetworkTopology::build(&config).unwrap()
    }

    fn position(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|&x| x == id).unwrap()
    }

    #[test]
    fn parents_come_first() {
        let topology = topology(3, 4);
        let order = GraphOrder::new(&topology, topology.output_layer().to_vec()).unwrap();
        assert_eq!(order.forward().len(), topology.len());
        for &id in order.forward() {
            for (parent, _) in topology.node(id).unwrap().parents() {
                assert!(position(order.forward(), parent) < position(order.forward(), id));
            }
        }
        assert_eq!(order.destinations(), topology.output_layer());
    }

    #[test]
    fn shared_ancestors_appear_once() {
        let topology = topology(8, 8);
        let order = dependency_order(&topology, topology.output_layer()).unwrap();
        let mut dedup = order.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), order.len());
        assert_eq!(order.len(), 2 + 2 + 8 * 8);
    }

    #[test]
    fn only_ancestors() {
        let topology = topology(1, 3);
        let hidden = topology.hidden_layers()[0][1];
        let order = dependency_order(&topology, &[hidden]).unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(*order.last().unwrap(), hidden);
        assert!(!order.contains(&topology.output_layer()[0]));
    }

    #[test]
    fn outdated_after_new_edge() {
        let mut topology = topology(1, 2);
        let order = GraphOrder::new(&topology, topology.output_layer().to_vec()).unwrap();
        assert!(order.is_current(&topology));
        let input = topology.input_layer()[0];
        let hidden = topology.hidden_layers()[0][0];
        // Overwriting a weight keeps the order valid
        topology.connect(input, hidden, 3.).unwrap();
        assert!(order.is_current(&topology));
        let output = topology.output_layer()[0];
        topology.connect(input, output, 1.).unwrap();
        assert!(!order.is_current(&topology));
    }

    #[test]
    fn unknown_destination() {
        let topology = topology(0, 0);
        let unknown = NodeId::new(42);
        assert_eq!(
            dependency_order(&topology, &[unknown]),
            Err(OrderError::UnknownNode(unknown))
        );
    }

    #[test]
    fn cycle_is_detected() {
        let mut topology = topology(2, 1);
        let first = topology.hidden_layers()[0][0];
        let second = topology.hidden_layers()[1][0];
        // Bypass `connect` which refuses to close the cycle
        topology.node_mut(first).unwrap().set_parent_weight(second, 1.);
        topology.node_mut(second).unwrap().add_child(first);
        let err = dependency_order(&topology, topology.output_layer()).unwrap_err();
        assert!(matches!(err, OrderError::CycleDetected(_)));
    }
}
