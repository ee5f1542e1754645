use std::path::PathBuf;

use anyhow::Context;
use authfilter::config::{self, AdapterConfig};
use authfilter::demo::{self, DemoIds};
use authfilter::materializer::SqliteBackend;
use authfilter::query_compiler::ToSql;
use authfilter::schema_catalog::{ColumnConvention, Entity};
use authfilter::{Condition, Datum, Filter, FilterAdapter, Projection};
use clap::Parser;

/// Authfilter - compile authorization filters to SQL and run them
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database file (`:memory:` for a throwaway database)
    #[arg(long, env = config::ENV_DATABASE, default_value = ":memory:")]
    database: String,

    /// Prefix prepended to every table name
    #[arg(long, env = config::ENV_TABLE_PREFIX, default_value = "")]
    table_prefix: String,

    /// Use singular table names (`user` instead of `users`)
    #[arg(long, env = config::ENV_SINGULAR_TABLES)]
    singular_tables: bool,

    /// Column naming convention: snake_case or camelCase
    #[arg(long, env = config::ENV_COLUMN_CONVENTION, default_value = "snake_case")]
    column_convention: ColumnConvention,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = config::ENV_LOG, default_value = "info")]
    log: String,

    /// Read the configuration from a YAML file instead of flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run one JSON-encoded filter instead of the demo filters
    #[arg(long)]
    filter: Option<PathBuf>,

    /// Skip seeding the demo data set
    #[arg(long)]
    no_seed: bool,
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            database_path: cli.database.clone(),
            table_prefix: cli.table_prefix.clone(),
            singular_tables: cli.singular_tables,
            column_convention: cli.column_convention,
            log_filter: cli.log.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AdapterConfig::from_yaml_file(path),
        None => AdapterConfig::from_cli((&cli).into()),
    }
    .context("Configuration error")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();

    println!("\nAuthfilter v{}\n", env!("CARGO_PKG_VERSION"));

    let registry = demo::registry().context("Failed to register demo entity types")?;
    let backend = SqliteBackend::from_config(&config).context("Failed to open database")?;
    backend
        .migrate(&registry)
        .context("Failed to create tables")?;

    let ids = if cli.no_seed {
        None
    } else {
        Some(demo::seed(&backend, &registry).context("Failed to seed demo data")?)
    };

    let adapter = FilterAdapter::new(&registry, &backend);

    let filters = match (&cli.filter, ids) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read filter file {}", path.display()))?;
            let filter: Filter =
                serde_json::from_str(&content).context("Failed to parse filter JSON")?;
            vec![("filter".to_string(), filter)]
        }
        (None, Some(ids)) => demo_filters(&ids),
        (None, None) => {
            log::warn!("Nothing to run: pass --filter or drop --no-seed");
            Vec::new()
        }
    };

    for (label, filter) in filters {
        let query = adapter.build_query(&filter)?;
        println!("-- {}", label);
        println!("{}", query.to_sql());
        println!("params: {}", serde_json::to_string(query.params())?);

        let rows = adapter.execute_query(&query)?;
        let json = rows
            .iter()
            .map(|row| Entity::to_json(row.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}\n", serde_json::to_string_pretty(&json)?);
    }

    Ok(())
}

/// Filters a policy engine would produce for the seeded admin user.
fn demo_filters(ids: &DemoIds) -> Vec<(String, Filter)> {
    vec![
        (
            "admin user".to_string(),
            Filter::new("User").or_where(vec![Condition::eq(
                Datum::identity("User"),
                Datum::value(ids.admin),
            )]),
        ),
        (
            "direct subteams of Root".to_string(),
            Filter::new("Team")
                .join("Team", "Team", "Parent")
                .or_where(vec![Condition::eq(
                    Projection::identity("Team").via("Parent").into(),
                    Datum::value(ids.root_team),
                )]),
        ),
        (
            "teams the admin owns".to_string(),
            Filter::new("Team")
                .join("Team", "UserTeamRole", "Users")
                .or_where(vec![
                    Condition::eq(Datum::field("UserTeamRole", "UserID"), Datum::value(ids.admin)),
                    Condition::eq(Datum::field("UserTeamRole", "Role"), Datum::value("owner")),
                ]),
        ),
        (
            "repositories readable by the admin".to_string(),
            Filter::new("Repository")
                .join("Repository", "Team", "Team")
                .join("Team", "UserTeamRole", "Users")
                .or_where(vec![Condition::eq(
                    Datum::field("UserTeamRole", "UserID"),
                    Datum::value(ids.admin),
                )])
                .or_where(vec![Condition::is_in(
                    Datum::field("Repository", "TeamID"),
                    Datum::list([ids.root_team, ids.other_team]),
                )]),
        ),
    ]
}
