use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;

use orecheck::checker::{CheckOutcome, DEFAULT_API_URL, DependencyStatus, UpdateChecker};
use orecheck::consent::{ConsentRegistry, MemoryConsentRegistry};
use orecheck::http::RemoteClient;
use orecheck::plugin::{DeclaredDependency, PluginMeta};

/// orecheck - update checker for Ore plugins
///
/// Asks the index for the promoted release of a plugin and reports
/// whether the given installed version is out of date, together with
/// dependency changes in the new release.
///
/// Examples:
///   orecheck nucleus 2.1.4
///   orecheck nucleus 2.1.4 --declared luckperms=5.0 --installed luckperms=4.3
#[derive(Parser, Debug)]
#[command(author, about)]
struct Cli {
    /// Plugin id on the index
    plugin_id: String,

    /// Installed version of the plugin
    version: String,

    /// Display name (defaults to the plugin id)
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Dependency declared by the plugin, as ID=VERSION (repeatable)
    #[arg(long = "declared", value_name = "ID=VERSION")]
    declared: Vec<String>,

    /// Other installed plugin, as ID=VERSION (repeatable)
    #[arg(long = "installed", value_name = "ID=VERSION")]
    installed: Vec<String>,

    /// Index API URL
    #[arg(long = "api-url", env = "ORECHECK_API_URL", value_name = "URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

fn parse_pair(pair: &str) -> Result<(String, String)> {
    let (id, version) = pair
        .split_once('=')
        .with_context(|| format!("expected ID=VERSION, got {pair:?}"))?;
    Ok((id.to_string(), version.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let plugin = PluginMeta {
        id: cli.plugin_id.clone(),
        name: cli.name.unwrap_or_else(|| cli.plugin_id.clone()),
        version: cli.version,
        dependencies: cli
            .declared
            .iter()
            .map(|pair| {
                let (id, version) = parse_pair(pair)?;
                Ok(DeclaredDependency { id, version })
            })
            .collect::<Result<_>>()?,
    };

    let installed: HashMap<String, String> = cli
        .installed
        .iter()
        .map(|pair| parse_pair(pair))
        .collect::<Result<_>>()?;

    // Running the command is the opt-in.
    let consent = MemoryConsentRegistry::new();
    consent.set_enabled(&plugin.id, true);

    let remote = RemoteClient::for_plugin(&plugin)?;
    let checker = UpdateChecker::new(&remote, &consent, &installed, cli.api_url);

    match checker.check(&plugin).await {
        CheckOutcome::Disabled => println!("{}: update checking is disabled", plugin.id),
        CheckOutcome::UpToDate => println!("{} {} is up to date", plugin.id, plugin.version),
        CheckOutcome::UpdateAvailable(report) => {
            println!("{} {} is available", plugin.id, report.version);
            for line in &report.description {
                println!("  {line}");
            }
            for status in &report.dependencies {
                match status {
                    DependencyStatus::New { id, required } => {
                        println!("new dependency: {id} version {required}")
                    }
                    DependencyStatus::NeedsUpgrade { id, required } => {
                        println!("dependency needs upgrade: {id} to version {required}")
                    }
                    DependencyStatus::Satisfied { id } => {
                        println!("dependency satisfied: {id}")
                    }
                    DependencyStatus::Stale { id } => {
                        println!("dependency no longer required: {id}")
                    }
                    DependencyStatus::Ignored { id } => {
                        println!("dependency skipped (unparseable version): {id}")
                    }
                }
            }
        }
        CheckOutcome::Failed(error) => {
            anyhow::bail!("update check for {} failed: {error}", plugin.id)
        }
    }

    Ok(())
}
