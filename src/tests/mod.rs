use strict_num::FiniteF64;

use crate::{
    activation::Activation,
    config::{NetworkConfig, WeightInit},
    topology::NetworkTopology,
};


pub fn layered(
    input_count: usize,
    output_count: usize,
    hidden_layer_count: usize,
    hidden_layer_width: usize,
    initial_weight: f64,
    activation: Activation,
) -> NetworkTopology {
    let config = NetworkConfig {
        input_count,
        output_count,
        hidden_layer_count,
        hidden_layer_width,
        initial_weight: WeightInit::Constant(initial_weight),
        activation,
    };
    NetworkTopology::build(&config).unwrap()
}

pub fn max_i(x: &[f64]) -> usize {
    assert!(!x.is_empty());
    let mut max = x[0];
    let mut max_i = 0;
    for (i, x) in x.iter().copied().enumerate() {
        FiniteF64::new(x).unwrap();
        if max < x {
            max = x;
            max_i = i;
        }
    }
    max_i
}
