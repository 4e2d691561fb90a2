//! SnipVault CLI - snippet storage and persistence

use std::sync::Arc;

use clap::{Parser, Subcommand};
use snipvault_core::config::{ConfigStore, StorageBackend, StorageConfig};
use snipvault_core::health::{
    migrate_local_to_remote, migrate_remote_to_local, repair_schema, validate_schema,
};
use snipvault_core::model::Snippet;
use snipvault_core::namespace::NamespaceManager;
use snipvault_core::storage::{LocalStore, RemoteStore, SnippetStore, active_store};

#[derive(Parser)]
#[command(name = "snipvault")]
#[command(author, version, about = "Snippet storage and persistence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage snippets
    Snippets {
        #[command(subcommand)]
        action: SnippetAction,
    },

    /// Manage namespaces
    Namespaces {
        #[command(subcommand)]
        action: NamespaceAction,
    },

    /// Storage backend configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check the health of the configured backend
    Doctor,

    /// Drop and recreate a corrupted local schema (destroys all local data)
    Repair {
        #[arg(long)]
        force: bool,
    },

    /// Move all snippets between backends
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Export the local store to a backup file
    Export {
        /// Destination file
        path: std::path::PathBuf,
    },

    /// Replace the local store with a backup file
    Import {
        /// Backup file to restore
        path: std::path::PathBuf,
        #[arg(long)]
        force: bool,
    },

    /// Show local store statistics
    Stats,

    /// Destroy all data on the active backend
    Wipe {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum SnippetAction {
    /// List snippets, most recently updated first
    List {
        /// Restrict to one namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Show snippet details
    Show { id: String },
    /// Store a new snippet
    Add {
        title: String,
        /// Snippet body
        #[arg(short, long)]
        code: String,
        #[arg(short, long, default_value = "javascript")]
        language: String,
        /// Target namespace (defaults to the default namespace)
        #[arg(short, long)]
        namespace: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a snippet
    Delete { id: String },
    /// Move snippets to another namespace
    Move {
        /// Snippet ids to move
        ids: Vec<String>,
        /// Target namespace id
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum NamespaceAction {
    /// List namespaces
    List,
    /// Create a namespace
    Add { name: String },
    /// Delete a namespace (its snippets move to the default namespace)
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the active backend
    Show,
    /// Switch to the embedded local store
    UseLocal,
    /// Switch to a remote storage service
    UseRemote { url: String },
    /// Show the config file path
    Path,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Copy every local snippet to a remote service and switch to it
    ToRemote { url: String },
    /// Switch back to the local store
    ToLocal,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("snipvault=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config_store = ConfigStore::from_env()?;

    match cli.command {
        Commands::Snippets { action } => cmd_snippets(&config_store, action, cli.quiet).await,
        Commands::Namespaces { action } => cmd_namespaces(&config_store, action, cli.quiet).await,
        Commands::Config { action } => cmd_config(&config_store, action, cli.quiet).await,
        Commands::Doctor => cmd_doctor(&config_store, cli.quiet).await,
        Commands::Repair { force } => cmd_repair(force, cli.quiet).await,
        Commands::Migrate { action } => cmd_migrate(&config_store, action, cli.quiet).await,
        Commands::Export { path } => cmd_export(&path, cli.quiet).await,
        Commands::Import { path, force } => cmd_import(&path, force, cli.quiet).await,
        Commands::Stats => cmd_stats(cli.quiet).await,
        Commands::Wipe { force } => cmd_wipe(&config_store, force, cli.quiet).await,
    }
}

async fn open_store(config_store: &ConfigStore) -> anyhow::Result<Arc<dyn SnippetStore>> {
    let config = config_store.load()?;
    Ok(active_store(&config).await?)
}

/// Store with the default namespace guaranteed to exist
async fn open_manager(config_store: &ConfigStore) -> anyhow::Result<NamespaceManager> {
    let store = open_store(config_store).await?;
    let mut manager = NamespaceManager::new(store);
    manager.ensure_default().await?;
    Ok(manager)
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

async fn cmd_snippets(
    config_store: &ConfigStore,
    action: SnippetAction,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        SnippetAction::List { namespace } => {
            let store = open_store(config_store).await?;
            let snippets = match namespace {
                Some(ns) => store.list_snippets_in_namespace(&ns).await?,
                None => store.list_snippets().await?,
            };
            if snippets.is_empty() {
                if !quiet {
                    println!("No snippets found.");
                    println!("\nAdd one with: snipvault snippets add <title> --code <code>");
                }
            } else {
                if !quiet {
                    println!("Snippets:");
                }
                for s in snippets {
                    let short_id = s.id.get(..8).unwrap_or(&s.id);
                    println!("  {} - {} ({}) [{}]", short_id, s.title, s.language, s.namespace_id);
                }
            }
        }
        SnippetAction::Show { id } => {
            let store = open_store(config_store).await?;
            match store.get_snippet(&id).await? {
                Some(s) => {
                    println!("Snippet: {}", s.title);
                    println!("  ID: {}", s.id);
                    println!("  Language: {}", s.language);
                    println!("  Category: {}", s.category);
                    println!("  Namespace: {}", s.namespace_id);
                    if !s.description.is_empty() {
                        println!("  Description: {}", s.description);
                    }
                    if !s.tags.is_empty() {
                        println!("  Tags: {}", s.tags.join(", "));
                    }
                    println!("  Created: {}", format_timestamp(s.created_at));
                    println!("  Updated: {}", format_timestamp(s.updated_at));
                    println!("\n{}", s.code);
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "Snippet '{}' not found. Run `snipvault snippets list` to see all snippets.",
                        id
                    ));
                }
            }
        }
        SnippetAction::Add {
            title,
            code,
            language,
            namespace,
            description,
        } => {
            let mut manager = open_manager(config_store).await?;
            if let Some(ns) = namespace {
                manager.select(ns);
            }
            let namespace_id = manager
                .selected()
                .ok_or_else(|| anyhow::anyhow!("no namespace selected"))?
                .to_string();

            let mut snippet = Snippet::new(&title, &code, &language, &namespace_id);
            if let Some(desc) = description {
                snippet.description = desc;
            }
            manager.store().create_snippet(&snippet).await?;
            if !quiet {
                println!("Snippet created: {}", snippet.id);
            }
        }
        SnippetAction::Delete { id } => {
            let store = open_store(config_store).await?;
            store.delete_snippet(&id).await?;
            if !quiet {
                println!("Snippet '{}' deleted.", id);
            }
        }
        SnippetAction::Move { ids, to } => {
            let store = open_store(config_store).await?;
            store.bulk_move_snippets(&ids, &to).await?;
            if !quiet {
                println!("Moved {} snippet(s) to namespace '{}'.", ids.len(), to);
            }
        }
    }
    Ok(())
}

async fn cmd_namespaces(
    config_store: &ConfigStore,
    action: NamespaceAction,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut manager = open_manager(config_store).await?;
    match action {
        NamespaceAction::List => {
            for ns in manager.list().await? {
                let marker = if ns.is_default { " (default)" } else { "" };
                println!("  {} - {}{}", ns.id, ns.name, marker);
            }
        }
        NamespaceAction::Add { name } => {
            let namespace = manager.create(&name).await?;
            if !quiet {
                println!("Namespace created: {}", namespace.id);
            }
        }
        NamespaceAction::Delete { id } => {
            manager.delete(&id).await?;
            if !quiet {
                println!("Namespace '{}' deleted; its snippets moved to the default namespace.", id);
            }
        }
    }
    Ok(())
}

async fn cmd_config(
    config_store: &ConfigStore,
    action: ConfigAction,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = config_store.load()?;
            match &config.backend {
                StorageBackend::Local => println!("Backend: local"),
                StorageBackend::Remote { url } => println!("Backend: remote ({})", url),
            }
            if config_store.is_overridden() {
                println!("(pinned by {})", snipvault_core::config::REMOTE_URL_ENV);
            }
        }
        ConfigAction::UseLocal => {
            config_store.save(&StorageConfig::default())?;
            if !quiet {
                println!("Switched to the local backend.");
            }
        }
        ConfigAction::UseRemote { url } => {
            // Validate before persisting
            let remote = RemoteStore::new(&url)?;
            if !remote.test_connection().await {
                return Err(anyhow::anyhow!(
                    "Remote service at '{}' is not reachable.",
                    url
                ));
            }
            config_store.save(&StorageConfig::remote(url.clone()))?;
            if !quiet {
                println!("Switched to the remote backend at {}.", url);
            }
        }
        ConfigAction::Path => {
            println!("{}", config_store.path().display());
        }
    }
    Ok(())
}

async fn cmd_doctor(config_store: &ConfigStore, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("SnipVault Health Check");
        println!("======================");
        println!();
    }

    let config = config_store.load()?;
    match &config.backend {
        StorageBackend::Local => {
            println!("[OK] Backend: local");
            match LocalStore::open_default().await {
                Ok(store) => {
                    println!("[OK] Database: Connected");
                    let health = validate_schema(&store).await?;
                    if health.is_healthy() {
                        println!("[OK] Schema: {}", health);
                    } else {
                        println!("[!!] Schema: {}", health);
                        println!("     Run `snipvault repair --force` to rebuild (destroys data).");
                    }
                    let stats = store.stats().await?;
                    println!("     Snippets: {}", stats.snippets);
                    println!("     Namespaces: {}", stats.namespaces);
                }
                Err(e) => {
                    println!("[!!] Database: Failed to open - {}", e);
                }
            }
        }
        StorageBackend::Remote { url } => {
            println!("[OK] Backend: remote ({})", url);
            if RemoteStore::probe(url).await {
                println!("[OK] Service: Reachable");
            } else {
                println!("[!!] Service: Not reachable");
            }
        }
    }
    Ok(())
}

async fn cmd_repair(force: bool, quiet: bool) -> anyhow::Result<()> {
    if !force {
        if !quiet {
            println!("Warning: This will destroy all local data.");
            println!("Use --force to confirm.");
        }
        return Ok(());
    }
    let store = LocalStore::open_default().await?;
    repair_schema(&store, true).await?;
    if !quiet {
        println!("Local schema rebuilt. The store is empty.");
    }
    Ok(())
}

async fn cmd_migrate(
    config_store: &ConfigStore,
    action: MigrateAction,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        MigrateAction::ToRemote { url } => {
            let remote = RemoteStore::new(&url)?;
            if !remote.test_connection().await {
                return Err(anyhow::anyhow!(
                    "Remote service at '{}' is not reachable.",
                    url
                ));
            }
            let local = LocalStore::open_default().await?;
            let report = migrate_local_to_remote(&local, &remote, config_store).await?;
            if !quiet {
                println!("Migrated {} snippet(s) to {}.", report.migrated, url);
                println!("The remote backend is now active.");
            }
        }
        MigrateAction::ToLocal => {
            let config = config_store.load()?;
            let url = match &config.backend {
                StorageBackend::Remote { url } => url.clone(),
                StorageBackend::Local => {
                    if !quiet {
                        println!("Already on the local backend.");
                    }
                    return Ok(());
                }
            };
            let remote = RemoteStore::new(&url)?;
            let report = migrate_remote_to_local(&remote, config_store).await?;
            if !quiet {
                println!("The local backend is now active.");
                println!(
                    "Note: {} remote snippet(s) were left on the service, not copied locally.",
                    report.total
                );
            }
        }
    }
    Ok(())
}

async fn cmd_export(path: &std::path::Path, quiet: bool) -> anyhow::Result<()> {
    let store = LocalStore::open_default().await?;
    let blob = store.export().await?;
    std::fs::write(path, &blob)?;
    if !quiet {
        println!("Exported {} bytes to {}.", blob.len(), path.display());
    }
    Ok(())
}

async fn cmd_import(path: &std::path::Path, force: bool, quiet: bool) -> anyhow::Result<()> {
    if !force {
        if !quiet {
            println!("Warning: This will replace all local data with the backup.");
            println!("Use --force to confirm.");
        }
        return Ok(());
    }
    let blob = std::fs::read(path)?;
    let store = LocalStore::open_default().await?;
    store.import(&blob).await?;
    let stats = store.stats().await?;
    if !quiet {
        println!(
            "Imported {} snippet(s) in {} namespace(s) from {}.",
            stats.snippets,
            stats.namespaces,
            path.display()
        );
    }
    Ok(())
}

async fn cmd_stats(quiet: bool) -> anyhow::Result<()> {
    let store = LocalStore::open_default().await?;
    let stats = store.stats().await?;
    if !quiet {
        println!("Local store:");
    }
    println!("  Snippets: {}", stats.snippets);
    println!("  Namespaces: {}", stats.namespaces);
    println!("  Size: {} bytes", stats.size_bytes);
    Ok(())
}

async fn cmd_wipe(config_store: &ConfigStore, force: bool, quiet: bool) -> anyhow::Result<()> {
    if !force {
        if !quiet {
            println!("Warning: This will destroy all data on the active backend.");
            println!("Use --force to confirm.");
        }
        return Ok(());
    }
    let store = open_store(config_store).await?;
    store.wipe().await?;
    if !quiet {
        println!("All data destroyed.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn snippet_add_parses_with_defaults() {
        let cli = Cli::parse_from(["snipvault", "snippets", "add", "Card", "--code", "<div/>"]);
        match cli.command {
            Commands::Snippets {
                action:
                    SnippetAction::Add {
                        title,
                        code,
                        language,
                        namespace,
                        ..
                    },
            } => {
                assert_eq!(title, "Card");
                assert_eq!(code, "<div/>");
                assert_eq!(language, "javascript");
                assert!(namespace.is_none());
            }
            _ => panic!("parsed into the wrong command"),
        }
    }

    #[test]
    fn move_requires_a_target_namespace() {
        assert!(Cli::try_parse_from(["snipvault", "snippets", "move", "abc"]).is_err());
    }

    #[test]
    fn quiet_flag_is_global() {
        let cli = Cli::parse_from(["snipvault", "stats", "--quiet"]);
        assert!(cli.quiet);
    }
}
