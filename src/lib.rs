pub mod activation;
pub mod config;
mod dump;
pub mod evaluate;
pub mod mnist;
pub mod node;
pub mod order;
pub mod topology;
#[cfg(test)]
mod tests;

pub use activation::Activation;
pub use config::{NetworkConfig, WeightInit};
pub use dump::RecursiveDump;
pub use evaluate::{EvaluateError, Evaluation};
pub use node::{LayerKind, Node, NodeId, NodePosition};
pub use order::GraphOrder;
pub use topology::{ConnectError, ConstructionError, NetworkTopology};
