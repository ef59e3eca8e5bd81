use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_advisor::{
    advisor::Advisor, api, config::AdvisorConfig, db, models::ProfileSubmission, rules::RuleSet,
};

#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Rule-based course and career recommendations for students")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// SQLite database file (overrides ADVISOR_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Rule file (overrides ADVISOR_RULES_PATH)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Evaluate a profile against the rules without storing anything
    Recommend {
        #[arg(long)]
        stream: String,

        #[arg(long)]
        interest: String,

        #[arg(long)]
        gpa: Option<f64>,

        /// Rule file (overrides ADVISOR_RULES_PATH)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Rule file utilities
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Validate a rule file
    Check { path: PathBuf },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "course_advisor=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load the configured rule file, or the bundled rules when none is set.
fn load_rules(path: Option<&PathBuf>) -> anyhow::Result<RuleSet> {
    let rules = match path {
        Some(path) => RuleSet::from_path(path)?,
        None => RuleSet::bundled()?,
    };
    tracing::info!(
        "Loaded {} rules (version {})",
        rules.len(),
        rules.version()
    );
    Ok(rules)
}

async fn serve(port: u16, config: AdvisorConfig) -> anyhow::Result<()> {
    tracing::info!("Starting course advisor on port {}", port);

    let rules = load_rules(config.rules_path.as_ref())?;

    let db = match &config.db_path {
        Some(path) => db::Database::open(path.clone())?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    let advisor = Advisor::new(db, Arc::new(rules), &config);
    let app = api::create_router(advisor);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Course advisor listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = AdvisorConfig::from_env();

    match cli.command {
        Some(Commands::Serve { port, db, rules }) => {
            config.db_path = db.or(config.db_path);
            config.rules_path = rules.or(config.rules_path);
            serve(port, config).await?;
        }
        Some(Commands::Recommend {
            stream,
            interest,
            gpa,
            rules,
        }) => {
            config.rules_path = rules.or(config.rules_path);
            let rules = load_rules(config.rules_path.as_ref())?;
            let advisor = Advisor::new(db::Database::open_memory()?, Arc::new(rules), &config);

            let result = advisor
                .preview(&ProfileSubmission {
                    stream,
                    interest,
                    subjects: Default::default(),
                    results: Default::default(),
                    gpa,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Some(Commands::Rules {
            command: RulesCommand::Check { path },
        }) => {
            let rules = RuleSet::from_path(&path)?;
            println!(
                "{}: {} rules, version {}",
                path.display(),
                rules.len(),
                rules.version()
            );
        }
        None => serve(3000, config).await?,
    }

    Ok(())
}
