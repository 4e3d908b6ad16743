use std::path::PathBuf;

use apigraph_core::document::HttpMethod;
use apigraph_core::{normalize_uri, ApiGraph, Config, DocumentLoader, Loader, NodeKey};
use clap::{Parser, Subcommand};
use color_eyre::Result;
use serde::Serialize;

mod models;
mod telemetry;

use models::{DependencyReport, EdgeSummary, NodeSummary};

#[derive(Parser)]
#[command(name = "apigraph")]
#[command(about = "Explore links and dependencies between OpenAPI operations", long_about = None)]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of apigraph.toml / the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every operation reachable from a document
    Nodes {
        /// Entry document (path or URL)
        doc: String,
    },
    /// List every link and backlink edge
    Edges {
        /// Entry document (path or URL)
        doc: String,
    },
    /// Show the operations that must run before the given one
    Deps {
        /// Entry document (path or URL)
        doc: String,

        /// HTTP method of the operation
        #[arg(long)]
        method: HttpMethod,

        /// Path template of the operation, e.g. /users/{id}
        #[arg(long)]
        path: String,

        /// Document declaring the operation, if not the entry document
        #[arg(long)]
        doc_uri: Option<String>,

        /// Dependency chain to follow; omit for anonymous edges only
        #[arg(long)]
        chain: Option<String>,

        /// Ignore edges that belong to every chain
        #[arg(long)]
        no_anonymous: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    telemetry::init(&config.logging)?;

    let loader = Loader::from_config(&config)?;

    match cli.command {
        Commands::Nodes { doc } => {
            let graph = build(&doc, &loader)?;
            let nodes: Vec<NodeSummary> = graph
                .nodes()
                .map(|(key, detail)| NodeSummary::new(key, detail))
                .collect();

            if cli.json {
                return print_json(&nodes);
            }
            for node in nodes {
                match (node.resolved, node.summary) {
                    (false, _) => println!("{}  (unresolved)", node.key),
                    (true, Some(summary)) => println!("{}  {}", node.key, summary),
                    (true, None) => println!("{}", node.key),
                }
            }
        }
        Commands::Edges { doc } => {
            let graph = build(&doc, &loader)?;
            let edges: Vec<EdgeSummary> = graph.edges().map(EdgeSummary::from).collect();

            if cli.json {
                return print_json(&edges);
            }
            for edge in edges {
                println!(
                    "{} -> {}  [{} chain={} response={}] {}",
                    edge.from,
                    edge.to,
                    edge.link_type,
                    edge.chain_id.as_deref().unwrap_or("*"),
                    edge.response_id,
                    edge.name
                );
            }
        }
        Commands::Deps {
            doc,
            method,
            path,
            doc_uri,
            chain,
            no_anonymous,
        } => {
            let entry = normalize_uri(&doc)?;
            let graph = ApiGraph::build(&entry, &loader)?;
            let doc_uri = match doc_uri {
                Some(uri) => normalize_uri(&uri)?,
                None => entry,
            };
            let node = NodeKey::new(doc_uri, path, method);

            let subgraph = graph.ancestors_of(&node, chain.as_deref(), !no_anonymous)?;
            let report = DependencyReport {
                node: node.to_string(),
                chain_id: chain,
                include_anonymous: !no_anonymous,
                order: subgraph
                    .topological_order()
                    .into_iter()
                    .map(|key| NodeSummary::new(key, graph.node(key)))
                    .collect(),
                edges: subgraph.edges().map(EdgeSummary::from).collect(),
            };

            if cli.json {
                return print_json(&report);
            }
            for (i, step) in report.order.iter().enumerate() {
                println!("{:>3}. {}", i + 1, step.key);
            }
        }
    }

    Ok(())
}

fn build<L: DocumentLoader + ?Sized>(doc: &str, loader: &L) -> Result<ApiGraph> {
    let uri = normalize_uri(doc)?;
    tracing::debug!(uri = %uri, "Building graph");
    Ok(ApiGraph::build(&uri, loader)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
