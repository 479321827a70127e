//! Rewire CLI - cost-driven optimization of DNN dataflow graphs
//!
//! Builds one of the bundled model graphs, reports its baseline runtime,
//! searches the substitution space for a cheaper equivalent graph, and
//! optionally exports the result.
//!
//! ```text
//! rewire --dnn squeezenet
//! rewire --dnn resnet50 --budget 500 --beta 1.05 --export resnet50.rdag
//! rewire --dnn resnet18 --noopt
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rewire_core::AnalyticOracle;
use rewire_graph::serialization::{export_graph, save_graph_file};
use rewire_graph::{Graph, Model};
use rewire_search::{optimize, standard_xfers, SearchConfig};

mod models;

/// Cost-driven rewrite optimizer for DNN dataflow graphs
#[derive(Parser)]
#[command(name = "rewire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model whose graph to optimize
    #[arg(long, value_enum)]
    dnn: DnnModel,

    /// Maximum number of search expansions
    #[arg(long, default_value_t = 300)]
    budget: usize,

    /// Cost slack factor (>= 1.0) for admitting temporarily-worse graphs
    #[arg(long, default_value_t = 1.01)]
    beta: f64,

    /// Skip the search and report the input graph as-is
    #[arg(long)]
    noopt: bool,

    /// Export the final graph to this path
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DnnModel {
    Squeezenet,
    Resnet18,
    Resnet34,
    Resnet50,
}

impl DnnModel {
    fn build(self, model: &mut Model) -> Result<Graph, rewire_graph::GraphError> {
        match self {
            DnnModel::Squeezenet => models::squeezenet(model),
            DnnModel::Resnet18 => models::resnet18(model),
            DnnModel::Resnet34 => models::resnet34(model),
            DnnModel::Resnet50 => models::resnet50(model),
        }
    }

    fn name(self) -> &'static str {
        match self {
            DnnModel::Squeezenet => "squeezenet",
            DnnModel::Resnet18 => "resnet18",
            DnnModel::Resnet34 => "resnet34",
            DnnModel::Resnet50 => "resnet50",
        }
    }
}

fn report(label: &str, graph: &Graph, model: &mut Model) -> anyhow::Result<()> {
    let runtime_ms = graph.run(model)?;
    info!(
        label,
        runtime_ms,
        nodes = graph.node_count(),
        "end-to-end runtime"
    );
    for (kind, count, cost_ms) in graph.cost_breakdown() {
        info!(label, %kind, count, cost_ms, "cost breakdown");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.beta < 1.0 {
        bail!("--beta must be at least 1.0, got {}", cli.beta);
    }

    let mut model = Model::new(Box::new(AnalyticOracle::default()));
    let graph = cli.dnn.build(&mut model)?;
    info!(dnn = cli.dnn.name(), beta = cli.beta, budget = cli.budget, "loaded model graph");
    report("baseline", &graph, &mut model)?;

    let final_graph = if cli.noopt {
        graph
    } else {
        let xfers = standard_xfers()?;
        let config = SearchConfig {
            budget: cli.budget,
            beta: cli.beta,
        };
        let outcome = optimize(graph, &mut model, &xfers, &config)?;
        info!(
            expanded = outcome.expanded,
            duplicates_skipped = outcome.duplicates_skipped,
            "search finished"
        );
        report("optimized", &outcome.graph, &mut model)?;
        outcome.graph
    };

    if let Some(path) = &cli.export {
        let file = export_graph(&final_graph, cli.dnn.name())?;
        save_graph_file(&file, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "exported graph");
    }

    Ok(())
}
