use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use unit_scan::core::render;
use unit_scan::shared::types::CatalogSeed;
use unit_scan::{ConversionEngine, EngineResult, EngineSettings, MemoryStore, RedbStore, StaticContext, UnitStore};

#[derive(Parser)]
#[command(name = "unitscan")]
#[command(about = "Find quantities in text and convert them", long_about = None)]
struct Cli {
    /// Catalog seed (units, allowances, currency preferences) as JSON
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Use a redb catalog database instead of an in-memory store
    #[arg(long)]
    db: Option<PathBuf>,

    /// Settings file (default: platform config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Community used for allowance lookups
    #[arg(long, default_value = "local")]
    community: String,

    /// Currencies to convert into, e.g. usd,eur
    #[arg(long, value_delimiter = ',')]
    currencies: Vec<String>,

    /// Print every scan outcome as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("unitscan: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let settings = match &cli.settings {
        Some(path) => EngineSettings::load_from(path).await?,
        None => EngineSettings::load().await.unwrap_or_else(|e| {
            log::warn!("[unitscan] Failed to load settings, using defaults: {}", e);
            EngineSettings::default()
        }),
    };

    let store: Box<dyn UnitStore> = match &cli.db {
        Some(path) => {
            let store = RedbStore::open(path).await?;
            if let Some(seed) = &cli.seed {
                let content = tokio::fs::read_to_string(seed).await?;
                let seed: CatalogSeed = serde_json::from_str(&content)?;
                store.import_seed(&seed)?;
            }
            Box::new(store)
        }
        None => match &cli.seed {
            Some(seed) => Box::new(MemoryStore::from_json_file(seed).await?),
            None => Box::new(MemoryStore::builtin()),
        },
    };

    let engine = ConversionEngine::load(settings, store.as_ref()).await?;
    let context = StaticContext::new(cli.currencies.iter().map(|code| code.trim().to_lowercase()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.to_lowercase();
        let outcome = engine.scan(&text, &cli.community, &context).await;

        if cli.json {
            println!("{}", serde_json::to_string(&outcome)?);
            continue;
        }
        for block in render::render_all(&outcome.results) {
            println!("{}", block);
        }
    }
    Ok(())
}
