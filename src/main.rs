use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use curiosity::{
    mnist::{combine, load_idx, ReadOptions},
    Activation, NetworkConfig, NetworkTopology, WeightInit,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "curiosity")]
#[command(about = "Layered feed-forward network graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level: trace, debug, info, warn or error
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a topology and print every node reachable from the input layer
    Build {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Build a topology and run one evaluation pass
    Evaluate {
        #[command(flatten)]
        network: NetworkArgs,

        /// Comma-separated values of the input nodes
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        inputs: Vec<f64>,

        /// Bias of every node
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        bias: f64,
    },

    /// Load an IDX image file and its label file
    Mnist {
        #[arg(long)]
        images: PathBuf,

        #[arg(long)]
        labels: PathBuf,

        /// Number of entries to read; 0 to read all
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Feed the first image through a network with one input per pixel
        #[arg(long)]
        evaluate: bool,

        /// Nodes per hidden layer of that network
        #[arg(long, default_value = "16")]
        hidden_layer_width: usize,
    },
}

#[derive(Args)]
struct NetworkArgs {
    /// RON file with a network configuration; overrides the other flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "2")]
    input_count: usize,

    #[arg(long, default_value = "1")]
    output_count: usize,

    #[arg(long, default_value = "1")]
    hidden_layer_count: usize,

    #[arg(long, default_value = "2")]
    hidden_layer_width: usize,

    /// Weight of every constructed edge
    #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
    initial_weight: f64,

    /// identity, sigmoid, tanh, relu or swish
    #[arg(long, default_value = "identity")]
    activation: Activation,
}
impl NetworkArgs {
    fn config(&self) -> Result<NetworkConfig> {
        if let Some(path) = &self.config {
            return NetworkConfig::load_ron(path)
                .with_context(|| format!("Failed to load config from {}", path.display()));
        }
        Ok(NetworkConfig {
            input_count: self.input_count,
            output_count: self.output_count,
            hidden_layer_count: self.hidden_layer_count,
            hidden_layer_width: self.hidden_layer_width,
            initial_weight: WeightInit::Constant(self.initial_weight),
            activation: self.activation,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Curiosity v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Build { network } => {
            let config = network.config()?;
            let topology = NetworkTopology::build(&config).context("Failed to build network")?;
            info!(
                nodes = topology.len(),
                edges = topology.num_edges(),
                "Built network"
            );
            println!("{}", topology.recursive_dump());
        }
        Commands::Evaluate {
            network,
            inputs,
            bias,
        } => {
            let config = network.config()?;
            let mut topology =
                NetworkTopology::build(&config).context("Failed to build network")?;
            topology.set_all_biases(bias)?;
            let outputs = topology.evaluate(&inputs)?;
            for (id, output) in topology.output_layer().iter().zip(&outputs) {
                info!(node = %id, output, "Output");
            }
            println!("{outputs:?}");
        }
        Commands::Mnist {
            images,
            labels,
            limit,
            evaluate,
            hidden_layer_width,
        } => {
            let options = ReadOptions { max_entries: limit };
            let images = load_idx(&images, options)
                .with_context(|| format!("Failed to read {}", images.display()))?;
            let labels = load_idx(&labels, options)
                .with_context(|| format!("Failed to read {}", labels.display()))?;
            let dataset = combine(images, labels)?;
            println!("{dataset}");

            if evaluate {
                let Some(example) = dataset.examples().first() else {
                    bail!("The dataset is empty");
                };
                let config = NetworkConfig {
                    input_count: dataset.pixels_per_image(),
                    output_count: 10,
                    hidden_layer_count: 1,
                    hidden_layer_width,
                    initial_weight: WeightInit::Uniform,
                    activation: Activation::Sigmoid,
                };
                let mut topology =
                    NetworkTopology::build(&config).context("Failed to build network")?;
                let inputs = example.inputs().collect::<Vec<f64>>();
                let outputs = topology.evaluate(&inputs)?;
                info!(label = example.label, "Evaluated first example");
                println!("{outputs:?}");
            }
        }
    }
    Ok(())
}
