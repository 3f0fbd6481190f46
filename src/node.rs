//! # Terminologies
//!
//! - parent: a node whose output feeds into this node through a weighted edge
//! - child: a node this node feeds into
//! - $b$: the bias of the node
//! - $f$: the activation function of the node
//!
//! The output of a node is
//! ```math
//! f(\sum_p w_p \cdot y_p + b)
//! ```

use std::fmt;

use crate::activation::Activation;

/// Identity of a node, allocated by the owning topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);
impl NodeId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Input,
    /// The `n`-th hidden layer, starting from zero
    Hidden(usize),
    Output,
}
impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Input => f.write_str("input"),
            LayerKind::Hidden(n) => write!(f, "hidden.{n}"),
            LayerKind::Output => f.write_str("output"),
        }
    }
}

/// Where a node sits in the layered topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodePosition {
    pub layer: LayerKind,
    /// Index within the layer
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    position: NodePosition,
    bias: f64,
    activation: Activation,
    /// $\sum_p w_p \cdot y_p + b$ from the last evaluation
    input_value: f64,
    /// $f$ applied to `input_value`, or the injected value if clamped
    output_value: f64,
    clamped: bool,
    /// The single source of truth for incoming edges
    ///
    /// Keyed by parent; kept in insertion order so that accumulation is deterministic.
    parent_weights: Vec<(NodeId, f64)>,
    /// Inverse view of `parent_weights` of the children
    children: Vec<NodeId>,
}
impl Node {
    fn check_rep(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for (i, (parent, _)) in self.parent_weights.iter().enumerate() {
            assert_ne!(*parent, self.id);
            assert!(!self.parent_weights[i + 1..]
                .iter()
                .any(|(other, _)| other == parent));
        }
        for (i, child) in self.children.iter().enumerate() {
            assert_ne!(*child, self.id);
            assert!(!self.children[i + 1..].contains(child));
        }
    }

    pub(crate) fn new(id: NodeId, position: NodePosition, activation: Activation) -> Self {
        let this = Self {
            id,
            position,
            bias: 0.,
            activation,
            input_value: 0.,
            output_value: 0.,
            clamped: false,
            parent_weights: vec![],
            children: vec![],
        };
        this.check_rep();
        this
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
    pub fn position(&self) -> NodePosition {
        self.position
    }
    pub fn bias(&self) -> f64 {
        self.bias
    }
    pub fn activation(&self) -> Activation {
        self.activation
    }
    pub fn input_value(&self) -> f64 {
        self.input_value
    }
    pub fn output_value(&self) -> f64 {
        self.output_value
    }
    /// Whether the output is an injected value rather than a computed one
    pub fn is_clamped(&self) -> bool {
        self.clamped
    }

    /// Incoming edges as `(parent, weight)` in insertion order
    pub fn parents(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.parent_weights.iter().copied()
    }
    pub fn num_parents(&self) -> usize {
        self.parent_weights.len()
    }
    pub fn weight_from(&self, parent: NodeId) -> Option<f64> {
        self.parent_weights
            .iter()
            .find(|(p, _)| *p == parent)
            .map(|(_, w)| *w)
    }
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    /// Return `true` if the edge is new; otherwise the previous weight is overwritten
    pub(crate) fn set_parent_weight(&mut self, parent: NodeId, weight: f64) -> bool {
        let is_new = match self.parent_weights.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, w)) => {
                *w = weight;
                false
            }
            None => {
                self.parent_weights.push((parent, weight));
                true
            }
        };
        self.check_rep();
        is_new
    }

    pub(crate) fn add_child(&mut self, child: NodeId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
        self.check_rep();
    }

    /// Inject `value` as both the input and the output of this node
    pub(crate) fn clamp(&mut self, value: f64) {
        self.input_value = value;
        self.output_value = value;
        self.clamped = true;
    }
    pub(crate) fn release(&mut self) {
        self.clamped = false;
    }

    /// `weighted_sum`: $\sum_p w_p \cdot y_p$
    ///
    /// Overwrites the values of the previous evaluation.
    pub(crate) fn activate(&mut self, weighted_sum: f64) -> f64 {
        if self.clamped {
            return self.output_value;
        }
        self.input_value = weighted_sum + self.bias;
        self.output_value = self.activation.call(self.input_value);
        self.output_value
    }
}

/// ```text
/// Node <id>: Children: [<child>, ...], Data: [layer=<layer>, index=<i>, activation=<name>, bias=<b>, input=<x>, output=<y>]
/// ```
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node {}: Children: [", self.id)?;
        for (i, child) in self.children.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        write!(
            f,
            "], Data: [layer={}, index={}, activation={}, bias={}, input={}, output={}]",
            self.position.layer,
            self.position.index,
            self.activation,
            self.bias,
            self.input_value,
            self.output_value
        )
    }
}
