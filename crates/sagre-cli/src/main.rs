//! Sagre CLI - GraphSAGE training from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show statistics about an edge-list graph
//! sagre stats cora.edge
//!
//! # Unsupervised training over sampled edges
//! sagre train-unsupervised cora.edge --dim 100 --epochs 5
//!
//! # Supervised node classification
//! sagre train-supervised cora.edge --labels cora.label --classes 7 \
//!     --features cora.feature --dim 1433
//! ```
//!
//! Edge files are whitespace `src dst` lines; feature files are
//! `id v1 v2 ...`; label files are `id class`. Without `--features`,
//! input features are randomly initialized.

use anyhow::{Context, Result};
use candle_core::Device;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::ProgressBar;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use sagre_core::loaders::{load_graph, load_node_labels, load_sparse_node_embedding};
use sagre_core::{Graph, GraphBuilder, NodeEmbedding, SubGraph};
use sagre_nn::training::{evaluate, train_supervised, train_unsupervised};
use sagre_nn::{
    Aggregator, EdgeDataset, NodeLabelDataset, SupervisedGraphSage, TrainingConfig,
    UnSupervisedGraphSage,
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "sagre")]
#[command(about = "GraphSAGE training CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about an edge-list graph
    Stats {
        /// Input edge file (`src dst` per line)
        edges: PathBuf,

        /// Add the reverse of every edge
        #[arg(long)]
        undirected: bool,
    },

    /// Train unsupervised embeddings over sampled edges
    TrainUnsupervised {
        /// Input edge file (`src dst` per line)
        edges: PathBuf,

        /// Node feature file (`id v1 v2 ...`); random init if omitted
        #[arg(long)]
        features: Option<PathBuf>,

        /// Input feature dimension
        #[arg(long, default_value = "100")]
        dim: usize,

        /// Per-layer output dimensions
        #[arg(long, value_delimiter = ',', default_value = "20,10")]
        output_dims: Vec<usize>,

        /// Per-layer neighbor fan-out caps
        #[arg(long, value_delimiter = ',', default_value = "5,5")]
        fanouts: Vec<usize>,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Train a node classifier
    TrainSupervised {
        /// Input edge file (`src dst` per line)
        edges: PathBuf,

        /// Node label file (`id class` per line)
        #[arg(long)]
        labels: PathBuf,

        /// Number of classes
        #[arg(long)]
        classes: usize,

        /// Node feature file (`id v1 v2 ...`); random init if omitted
        #[arg(long)]
        features: Option<PathBuf>,

        /// Input feature dimension
        #[arg(long, default_value = "100")]
        dim: usize,

        /// Per-layer output dimensions
        #[arg(long, value_delimiter = ',', default_value = "20,10")]
        output_dims: Vec<usize>,

        /// Per-layer neighbor fan-out caps
        #[arg(long, value_delimiter = ',', default_value = "5,5")]
        fanouts: Vec<usize>,

        #[command(flatten)]
        train: TrainArgs,
    },
}

#[derive(clap::Args)]
struct TrainArgs {
    /// Add the reverse of every edge
    #[arg(long)]
    undirected: bool,

    /// Neighbor pooling function
    #[arg(long, default_value = "mean")]
    aggregator: AggregatorArg,

    /// Examples per batch
    #[arg(long, default_value = "1024")]
    batch_size: usize,

    /// Training epochs
    #[arg(long, default_value = "5")]
    epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value = "0.01")]
    lr: f64,

    /// Random seed (sampling, shuffling, feature init)
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum AggregatorArg {
    /// Average neighbor embeddings
    Mean,
    /// Element-wise maximum
    Max,
    /// Element-wise sum
    Sum,
}

impl From<AggregatorArg> for Aggregator {
    fn from(arg: AggregatorArg) -> Self {
        match arg {
            AggregatorArg::Mean => Aggregator::Mean,
            AggregatorArg::Max => Aggregator::MaxPool,
            AggregatorArg::Sum => Aggregator::Sum,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { edges, undirected } => cmd_stats(&edges, undirected),
        Commands::TrainUnsupervised {
            edges,
            features,
            dim,
            output_dims,
            fanouts,
            train,
        } => cmd_train_unsupervised(&edges, features.as_deref(), dim, &output_dims, &fanouts, &train),
        Commands::TrainSupervised {
            edges,
            labels,
            classes,
            features,
            dim,
            output_dims,
            fanouts,
            train,
        } => cmd_train_supervised(
            &edges,
            &labels,
            classes,
            features.as_deref(),
            dim,
            &output_dims,
            &fanouts,
            &train,
        ),
    }
}

fn load_edge_graph(path: &std::path::Path, undirected: bool) -> Result<Graph> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", path.display()));

    let mut builder = GraphBuilder::new();
    load_graph(path, &mut builder)
        .with_context(|| format!("Failed to load edges from {}", path.display()))?;

    if undirected {
        let mut mirrored = GraphBuilder::new();
        let graph = builder.build();
        for &(src, dst) in graph.edges() {
            mirrored.add_undirected_edge(src, dst);
        }
        builder = mirrored;
    }

    let graph = builder.build();
    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(graph)
}

fn load_features(
    path: Option<&std::path::Path>,
    graph: &Graph,
    dim: usize,
    seed: u64,
) -> Result<NodeEmbedding> {
    let mut store = NodeEmbedding::new(dim);
    match path {
        Some(path) => {
            load_sparse_node_embedding(path, &mut store)
                .with_context(|| format!("Failed to load features from {}", path.display()))?;
        }
        None => {
            let mut rng = XorShiftRng::seed_from_u64(seed);
            store.random_init(&graph.node_set(), &mut rng);
        }
    }
    Ok(store)
}

fn cmd_stats(edges: &std::path::Path, undirected: bool) -> Result<()> {
    let graph = load_edge_graph(edges, undirected)?;
    let stats = graph.stats();

    println!("Graph Statistics");
    println!("================");
    println!("Nodes:      {}", stats.node_count);
    println!("Edges:      {}", stats.edge_count);
    println!("Avg degree: {:.2}", stats.avg_degree);

    Ok(())
}

fn cmd_train_unsupervised(
    edges: &std::path::Path,
    features: Option<&std::path::Path>,
    dim: usize,
    output_dims: &[usize],
    fanouts: &[usize],
    train: &TrainArgs,
) -> Result<()> {
    let graph = load_edge_graph(edges, train.undirected)?;
    let store = load_features(features, &graph, dim, train.seed)?;
    let sub_graph = SubGraph::new(&graph, train.seed);

    let model = UnSupervisedGraphSage::new(
        dim,
        output_dims,
        fanouts,
        train.aggregator.into(),
        &Device::Cpu,
    )?;

    let dataset = EdgeDataset::from_graph(&graph);
    println!(
        "Training unsupervised on {} edges ({} nodes)...",
        dataset.len(),
        graph.node_count()
    );

    let config = config_from(train);
    let start = Instant::now();
    let history = train_unsupervised(&model, &sub_graph, &store, &dataset, &config)?;

    println!(
        "Trained {} epochs in {:.2?}, final loss {:.4}",
        history.len(),
        start.elapsed(),
        history.last().copied().unwrap_or(f32::NAN)
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_train_supervised(
    edges: &std::path::Path,
    labels: &std::path::Path,
    classes: usize,
    features: Option<&std::path::Path>,
    dim: usize,
    output_dims: &[usize],
    fanouts: &[usize],
    train: &TrainArgs,
) -> Result<()> {
    let graph = load_edge_graph(edges, train.undirected)?;
    let store = load_features(features, &graph, dim, train.seed)?;
    let sub_graph = SubGraph::new(&graph, train.seed);

    let label_map = load_node_labels(labels)
        .with_context(|| format!("Failed to load labels from {}", labels.display()))?;
    let dataset = NodeLabelDataset::from_labels(&label_map);

    let model = SupervisedGraphSage::new(
        dim,
        classes,
        output_dims,
        fanouts,
        train.aggregator.into(),
        &Device::Cpu,
    )?;

    println!(
        "Training supervised on {} labeled nodes ({} classes)...",
        dataset.len(),
        classes
    );

    let config = config_from(train);
    let start = Instant::now();
    let history = train_supervised(&model, &sub_graph, &store, &dataset, &config)?;
    let acc = evaluate(&model, &sub_graph, &store, &dataset, config.batch_size)?;

    println!(
        "Trained {} epochs in {:.2?}, final loss {:.4}, train accuracy {:.4}",
        history.len(),
        start.elapsed(),
        history.last().copied().unwrap_or(f32::NAN),
        acc
    );
    Ok(())
}

fn config_from(train: &TrainArgs) -> TrainingConfig {
    TrainingConfig::default()
        .with_batch_size(train.batch_size)
        .with_epochs(train.epochs)
        .with_learning_rate(train.lr)
        .with_seed(train.seed)
}
