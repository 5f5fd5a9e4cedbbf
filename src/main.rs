use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use biograph_explorer::graph::{GraphDomain, Node, search_entities, search_literature};
use biograph_explorer::highlight::PathOutcome;
use biograph_explorer::{ExplorerConfig, ExplorerEvent, FixtureSource, Session};
use clap::{Parser, Subcommand};
use egui::Color32;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// TOML file with overlay tuning and defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "sars-cov-2")]
    domain: GraphDomain,

    /// Directory holding `<domain>.json` datasets instead of the bundled ones.
    #[arg(long)]
    fixtures: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the available domains.
    Domains,
    /// Node and link counts plus the type legend.
    Stats,
    /// Show a node with its highlighted neighborhood.
    Highlight { id: String },
    /// Shortest path between two nodes.
    Path { from: String, to: String },
    /// Fuzzy search over entities, or literature only.
    Search {
        query: String,
        #[arg(long)]
        literature: bool,
    },
    /// Run the quantum overlay for a number of ticks.
    Overlay {
        #[arg(long)]
        density: Option<f32>,
        #[arg(long, default_value_t = 600)]
        ticks: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

fn describe(node: &Node) -> String {
    format!("{:<24} {:<32} {}", node.id, node.label, node.node_type)
}

fn load_session(args: &Args, config: &ExplorerConfig) -> Result<Session> {
    let fixtures = args
        .fixtures
        .clone()
        .map_or(FixtureSource::Bundled, FixtureSource::Directory);
    let dataset = fixtures
        .load(args.domain)
        .with_context(|| format!("failed to load dataset for {}", args.domain))?;

    let mut session = Session::new(config);
    session
        .load_domain(args.domain, dataset)
        .with_context(|| format!("dataset for {} is inconsistent", args.domain))?;
    Ok(session)
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ExplorerConfig::load(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => ExplorerConfig::default(),
    };

    if let Command::Domains = args.command {
        for domain in GraphDomain::ALL {
            println!("{:<16} {}", domain.slug(), domain.label());
        }
        return Ok(());
    }

    let mut session = load_session(&args, &config)?;

    match &args.command {
        Command::Domains => {}
        Command::Stats => {
            let store = session.store().ok_or_else(|| anyhow!("no dataset loaded"))?;
            println!("{}: {} nodes, {} links", store.domain(), store.node_count(), store.link_count());
            for (node_type, color) in session.legend() {
                let count = store
                    .nodes()
                    .iter()
                    .filter(|node| node.node_type == node_type)
                    .count();
                println!("  {} {:<28} {count}", hex(color), node_type.label());
            }
        }
        Command::Highlight { id } => {
            session.click_node(id)?;
            let focal = session
                .focal_node()
                .ok_or_else(|| anyhow!("`{id}` did not become the focal node"))?;
            println!("{}", describe(focal));
            if !focal.description.is_empty() {
                println!("  {}", focal.description);
            }

            let store = session.store().ok_or_else(|| anyhow!("no dataset loaded"))?;
            let mut highlighted = session.highlight().nodes.iter().collect::<Vec<_>>();
            highlighted.sort();
            println!("highlighted ({}):", highlighted.len());
            for id in highlighted {
                if let Some(node) = store.node(id) {
                    println!("  {}", describe(node));
                }
            }

            let literature = session.related_literature();
            if !literature.is_empty() {
                println!("related literature:");
                for paper in literature {
                    println!("  {}", describe(paper));
                }
            }
        }
        Command::Path { from, to } => {
            if from == to {
                return Err(anyhow!("start and end must differ"));
            }
            session.enter_pathfinding();
            session.click_node(from)?;
            session.click_node(to)?;

            let store = session.store().ok_or_else(|| anyhow!("no dataset loaded"))?;
            match session.path() {
                Some(PathOutcome::Found(path)) => {
                    let labels = path
                        .nodes
                        .iter()
                        .map(|id| store.node(id).map_or(id.as_str(), |node| node.label.as_str()))
                        .collect::<Vec<_>>();
                    println!("{} hops: {}", path.hops(), labels.join(" -> "));
                }
                Some(PathOutcome::NotFound) | None => println!("no path between {from} and {to}"),
            }

            for event in session.drain_events() {
                if let ExplorerEvent::HypothesisRequested { query, .. } = event {
                    println!("hypothesis query: {query}");
                }
            }
        }
        Command::Search { query, literature } => {
            let store = session.store().ok_or_else(|| anyhow!("no dataset loaded"))?;
            let hits = if *literature {
                search_literature(store.nodes(), query)
            } else {
                search_entities(store.nodes(), query)
            };
            if hits.is_empty() {
                println!("no matches for `{query}`");
            }
            for node in hits {
                println!("{}", describe(node));
            }
        }
        Command::Overlay {
            density,
            ticks,
            seed,
        } => {
            let mut rng = seed
                .or(config.seed)
                .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            session.set_density(density.unwrap_or(config.default_density));
            session.set_quantum(true);

            let mut spawned = 0usize;
            for _ in 0..*ticks {
                let overlay = session.tick(&mut rng);
                spawned += overlay
                    .links
                    .iter()
                    .filter(|link| link.opacity >= 1.0)
                    .count();
            }

            let overlay = session.overlay();
            println!(
                "density {:.0}: {spawned} transient links over {ticks} ticks, {} visible",
                session.density(),
                overlay.len()
            );
            for link in &overlay.links {
                println!("  {} ~ {} ({:.2})", link.source, link.target, link.opacity);
            }
        }
    }

    Ok(())
}
