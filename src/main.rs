use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use model_mutation::config::Catalog;
use model_mutation::mutation::{build_schema, SchemaMutation};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Print the GraphQL schema of a mutation catalog.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// YAML catalog of models and mutations
    #[clap(short, long, default_value = "mutations.yaml")]
    config: String,
    /// Write the SDL here instead of stdout
    #[clap(short, long)]
    output: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    info!("Loading catalog: {}", args.config);
    let catalog = Catalog::load(&args.config)?;
    let registry = catalog.registry();
    let mutations: Vec<Arc<dyn SchemaMutation>> = catalog
        .build_mutations(&registry)?
        .into_iter()
        .map(|mutation| Arc::new(mutation) as Arc<dyn SchemaMutation>)
        .collect();
    info!(
        "Built {} mutation(s) over {} model type(s)",
        mutations.len(),
        registry.types().count()
    );

    let schema = build_schema(&registry, &mutations)
        .map_err(|e| anyhow!("Failed to build schema: {}", e))?;
    let sdl = schema.sdl();

    match args.output {
        Some(path) => {
            std::fs::write(&path, sdl).with_context(|| format!("Failed to write {}", path))?;
            info!("Schema written to {}", path);
        }
        None => println!("{}", sdl),
    }
    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sea_orm=warn,{}", log_level)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
