use strict_num::FiniteF64;
use thiserror::Error;
use tracing::debug;

use crate::{
    node::NodeId,
    order::{GraphOrder, OrderError},
    topology::NetworkTopology,
};

/// Result of one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// `outputs[i]`: output of destination $i$
    pub outputs: Vec<f64>,
    /// Number of node outputs computed in this pass, excluding clamped nodes
    pub nodes_computed: usize,
}

/// Evaluate every node in `forward` once
///
/// `forward` must list every node after all of its parents, as [`GraphOrder::forward`] does.
///
/// Return the number of nodes computed.
pub fn evaluate_once(
    topology: &mut NetworkTopology,
    forward: &[NodeId],
) -> Result<usize, EvaluateError> {
    let mut nodes_computed = 0;
    for &id in forward {
        let node = topology.node(id).ok_or(EvaluateError::UnknownNode(id))?;
        if node.is_clamped() {
            continue;
        }
        let mut weighted_sum = 0.;
        for (parent, weight) in node.parents() {
            let parent = topology
                .node(parent)
                .ok_or(EvaluateError::UnknownNode(parent))?;
            weighted_sum += weight * parent.output_value();
        }
        let node = topology
            .node_mut(id)
            .ok_or(EvaluateError::UnknownNode(id))?;
        node.activate(weighted_sum);
        nodes_computed += 1;
    }
    Ok(nodes_computed)
}

impl NetworkTopology {
    /// Clamp the input layer to `values`
    ///
    /// `values[i]`: value of the $i$-th input node
    pub fn set_inputs(&mut self, values: &[f64]) -> Result<(), EvaluateError> {
        if values.len() != self.input_layer().len() {
            return Err(EvaluateError::InputCountMismatch {
                expected: self.input_layer().len(),
                actual: values.len(),
            });
        }
        if let Some(&value) = values.iter().find(|x| FiniteF64::new(**x).is_none()) {
            return Err(EvaluateError::NonFiniteInput(value));
        }
        let inputs = self.input_layer().to_vec();
        for (id, value) in inputs.into_iter().zip(values.iter().copied()) {
            let node = self.node_mut(id).ok_or(EvaluateError::UnknownNode(id))?;
            node.clamp(value);
        }
        Ok(())
    }

    /// Let the input layer be computed from bias and activation again
    pub fn clear_inputs(&mut self) {
        let inputs = self.input_layer().to_vec();
        for id in inputs {
            if let Some(node) = self.node_mut(id) {
                node.release();
            }
        }
    }

    /// Evaluate the ancestors of `node` and then `node` itself
    pub fn compute_output(&mut self, node: NodeId) -> Result<f64, EvaluateError> {
        let order = GraphOrder::new(self, vec![node])?;
        let evaluation = self.evaluate_order(&order)?;
        Ok(evaluation.outputs[0])
    }

    /// Fail with [`EvaluateError::OutdatedOrder`] if an edge was added after `order` was computed
    pub fn evaluate_order(&mut self, order: &GraphOrder) -> Result<Evaluation, EvaluateError> {
        if !order.is_current(self) {
            return Err(EvaluateError::OutdatedOrder);
        }
        let nodes_computed = evaluate_once(self, order.forward())?;
        let outputs = order
            .destinations()
            .iter()
            .map(|&id| {
                self.node(id)
                    .map(|n| n.output_value())
                    .ok_or(EvaluateError::UnknownNode(id))
            })
            .collect::<Result<Vec<f64>, EvaluateError>>()?;
        debug!(
            destinations = order.destinations().len(),
            nodes_computed, "Evaluated"
        );
        Ok(Evaluation {
            outputs,
            nodes_computed,
        })
    }

    /// Clamp the input layer to `inputs` and evaluate the output layer
    ///
    /// `evaluate()[i]`: output of the $i$-th output node
    pub fn evaluate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, EvaluateError> {
        self.set_inputs(inputs)?;
        let order = GraphOrder::new(self, self.output_layer().to_vec())?;
        Ok(self.evaluate_order(&order)?.outputs)
    }

    /// Output values of the output layer from the last pass
    pub fn output_values(&self) -> Vec<f64> {
        self.output_layer()
            .iter()
            .filter_map(|&id| self.node(id))
            .map(|n| n.output_value())
            .collect()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluateError {
    #[error("Node {0} is not owned by the topology")]
    UnknownNode(NodeId),
    #[error("Cycle detected through node {0}")]
    CycleDetected(NodeId),
    #[error("Expected {expected} input values, got {actual}")]
    InputCountMismatch { expected: usize, actual: usize },
    #[error("Input value `{0}` is not finite")]
    NonFiniteInput(f64),
    #[error("An edge was added after the evaluation order was computed")]
    OutdatedOrder,
}
impl From<OrderError> for EvaluateError {
    fn from(value: OrderError) -> Self {
        match value {
            OrderError::UnknownNode(id) => Self::UnknownNode(id),
            OrderError::CycleDetected(id) => Self::CycleDetected(id),
        }
    }
}
