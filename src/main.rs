use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use country_exchange::artifact::SummaryArtifact;
use country_exchange::config::AppConfig;
use country_exchange::database_ops::refresh::RefreshService;
use country_exchange::database_ops::sources::HttpSources;
use country_exchange::logging::init_tracing;
use country_exchange::models::{CountryFilter, SortOrder, StatusSnapshot};
use country_exchange::util::db::Db;
use country_exchange::util::env as env_util;
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "countries", version, about = "Country exchange data admin CLI")]
struct Cli {
    /// Optional override for the database URL
    #[arg(long, global = true)]
    db_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Fetch both sources and reconcile them into the database
    Refresh,
    /// Print total countries and the last refresh timestamp
    Status,
    /// List countries with optional filters
    List {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        /// gdp_asc, gdp_desc, population_asc, population_desc, name_asc, name_desc
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show one country (case-insensitive name)
    Show { name: String },
    /// Delete one country (case-insensitive name)
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("warn")?;

    let cli = Cli::parse();
    let mut cfg = AppConfig::from_env()?;
    if let Some(url) = cli.db_url {
        cfg.database_url = url;
    }
    let db = Db::connect(&cfg.database_url, cfg.db_max_connections.min(5)).await?;

    match cli.command {
        Commands::Refresh => {
            let sources = Arc::new(HttpSources::new(&cfg.sources)?);
            let svc = RefreshService::new(db, sources)
                .with_artifact(SummaryArtifact::new(&cfg.cache_dir));
            print_json(&svc.run().await?)
        }
        Commands::Status => print_json(&StatusSnapshot {
            total_countries: db.country_count().await?,
            last_refreshed_at: db.refresh_marker().await?,
        }),
        Commands::List {
            region,
            currency,
            sort,
        } => {
            let filter = CountryFilter {
                region,
                currency,
                sort: SortOrder::from_param(sort.as_deref()),
            };
            print_json(&db.list_countries(&filter).await?)
        }
        Commands::Show { name } => match db.get_country_by_name(&name).await? {
            Some(country) => print_json(&country),
            None => bail!("Country not found: {name}"),
        },
        Commands::Delete { name } => match db.delete_country_by_name(&name).await? {
            Some(country) => print_json(&country),
            None => bail!("Country not found: {name}"),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
