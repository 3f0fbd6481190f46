//! Textual dumps of a topology
//!
//! ```text
//! [
//! Node 1: Children: [3], Data: [...]
//! Node 3: Children: [], Data: [...]
//! Node 2: Children: [3], Data: [...]]
//! ```

use std::{collections::HashSet, fmt};

use crate::{node::NodeId, topology::NetworkTopology};

impl NetworkTopology {
    /// Dump of every node reachable from the input layer, each printed once
    ///
    /// Nodes are visited depth first along child edges, starting from each input node in order.
    pub fn recursive_dump(&self) -> RecursiveDump<'_> {
        RecursiveDump { topology: self }
    }
}

/// Dump of the input layer only
impl fmt::Display for NetworkTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for node in self.input_layer().iter().filter_map(|&id| self.node(id)) {
            write!(f, "\n{node}")?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecursiveDump<'a> {
    topology: &'a NetworkTopology,
}
impl fmt::Display for RecursiveDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut visited = HashSet::new();
        f.write_str("[")?;
        for &input in self.topology.input_layer() {
            write_descendants(self.topology, input, &mut visited, f)?;
        }
        f.write_str("]")
    }
}

fn write_descendants(
    topology: &NetworkTopology,
    id: NodeId,
    visited: &mut HashSet<NodeId>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    if !visited.insert(id) {
        return Ok(());
    }
    let Some(node) = topology.node(id) else {
        return Ok(());
    };
    write!(f, "\n{node}")?;
    for &child in node.children() {
        write_descendants(topology, child, visited, f)?;
    }
    Ok(())
}
