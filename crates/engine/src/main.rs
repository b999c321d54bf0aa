//! Summoner Engine - Main entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use summoner_domain::RulesRegistry;
use summoner_engine::runner::{self, Args};
use summoner_engine::{ResolverSettings, SummonResolver};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment from repo root (the binary is often run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging. Stdout carries the JSON result, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "summoner_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = ResolverSettings::from_env();
    tracing::info!(
        game_system = %settings.game_system,
        flag_scope = %settings.flag_scope,
        formula_failure_policy = %settings.formula_failure_policy,
        "Starting Summoner Engine"
    );

    let registry = RulesRegistry::new();
    let resolver = SummonResolver::from_registry(&registry, settings)?;
    tracing::info!(rules = resolver.rules().display_name(), "Rules loaded");

    let request = runner::read_request(args.input.as_deref())?;
    runner::check_request(&request, resolver.settings().formula_failure_policy)?;
    let updates = if args.require_config {
        resolver.resolve_required(&request)?
    } else {
        resolver.resolve(&request)?
    };

    println!("{}", runner::render(&updates, args.pretty)?);
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
