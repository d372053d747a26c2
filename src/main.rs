use anyhow::{bail, Context, Result};
use bantotal_joins::catalog::{CatalogReader, CatalogSnapshot, PgCatalogReader};
use bantotal_joins::config::ExplorerConfig;
use bantotal_joins::discovery::RelationshipExplorer;
use bantotal_joins::planner::JoinPlanner;
use bantotal_joins::report::{render_exploration, write_sql_file};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bantotal-joins")]
#[command(about = "Discover related Bantotal tables by primary key alignment and generate JOIN plans")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one table and print its related tables and JOIN plans
    Explore {
        /// Table name, optionally qualified as schema.table
        table: String,

        /// Schema of the table (overridden by a qualified name)
        #[arg(short, long)]
        schema: Option<String>,

        /// Write the JOIN plans to this .sql file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Analyze several tables in order, one .sql file per table
    Batch {
        /// Table names, optionally qualified as schema.table
        #[arg(required = true)]
        tables: Vec<String>,

        /// Directory for the generated .sql files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Catalog snapshot (JSON) to read instead of a live database
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// PostgreSQL connection string (or set DATABASE_URL)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Explorer configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl SourceArgs {
    fn load_config(&self) -> Result<ExplorerConfig> {
        match &self.config {
            Some(path) => ExplorerConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(ExplorerConfig::default()),
        }
    }

    async fn open_catalog(&self) -> Result<Box<dyn CatalogReader>> {
        if let Some(path) = &self.snapshot {
            info!("📂 Loading catalog snapshot from {}", path.display());
            let snapshot = CatalogSnapshot::load(path)?;
            info!("✅ {} tables loaded", snapshot.tables().len());
            return Ok(Box::new(snapshot));
        }

        if let Some(url) = &self.database_url {
            info!("🔌 Connecting to catalog database");
            let reader = PgCatalogReader::connect(url).await?;
            info!("✅ Connected");
            return Ok(Box::new(reader));
        }

        bail!("No catalog source: pass --snapshot or set DATABASE_URL")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Explore {
            table,
            schema,
            output,
            source,
        } => {
            let config = source.load_config()?;
            let catalog = source.open_catalog().await?;
            let planner = JoinPlanner::new(config.plans.clone());
            let mut explorer = RelationshipExplorer::with_config(catalog, &config);

            let exploration = explorer.explore(&table, schema.as_deref(), &planner).await;
            println!("{}", render_exploration(&exploration));

            for (idx, plan) in exploration.plans.iter().enumerate() {
                println!("-- {}. {}", idx + 1, plan.description);
                println!("{};\n", plan.sql);
            }

            if let Some(path) = output {
                if exploration.plans.is_empty() {
                    warn!("⚠️  No JOIN plans for {}, {} not written", exploration.qualified_name(), path.display());
                } else {
                    write_sql_file(&path, &exploration)?;
                }
            }
        }
        Command::Batch {
            tables,
            output_dir,
            source,
        } => {
            let config = source.load_config()?;
            let catalog = source.open_catalog().await?;
            let planner = JoinPlanner::new(config.plans.clone());
            let mut explorer = RelationshipExplorer::with_config(catalog, &config);

            let explorations = explorer.explore_many(&tables, &planner).await;

            for exploration in &explorations {
                println!("{}", render_exploration(exploration));

                if let (Some(dir), false) = (&output_dir, exploration.plans.is_empty()) {
                    let path = dir.join(format!("joins_{}.sql", exploration.table.to_lowercase()));
                    if let Err(e) = write_sql_file(&path, exploration) {
                        warn!("⚠️  Could not write {}: {}", path.display(), e);
                    }
                }
            }

            let related = explorations.iter().filter(|e| e.has_relationships()).count();
            info!("📊 {} of {} tables have related tables", related, explorations.len());
        }
    }

    Ok(())
}
