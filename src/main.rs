//! Profile Registry CLI
//!
//! Entry point for the `profile-registry` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use profile_registry::kind::{DocumentKind, NAME_KEY, REV_KEY};
use profile_registry::redact::redact_secrets;
use profile_registry::settings::PROJECT_SETTINGS_FILE;
use profile_registry::{
    load_and_resolve, AgentProfile, Document, EffectiveSettings, LlmConfig, LoadReport,
    Registries, RegistrySettings, Snapshot,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "profile-registry")]
#[command(about = "Resolve and query inherited agent profiles and LLM configs", version)]
struct Cli {
    /// Path to settings file (default: ./profile-registry.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Fail on any invalid file or broken inheritance chain
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    AgentProfile,
    LlmConfig,
}

impl KindArg {
    /// The explicit directory, or the configured one for this kind
    fn directory(self, settings: &RegistrySettings, dir: Option<PathBuf>) -> PathBuf {
        dir.unwrap_or_else(|| match self {
            KindArg::AgentProfile => settings.directories.agent_profiles.clone(),
            KindArg::LlmConfig => settings.directories.llm_configs.clone(),
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load a directory and list the resolved documents
    Resolve {
        #[arg(long, short = 'k')]
        kind: KindArg,

        /// Document directory (default: from settings)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the latest active revision of a logical name
    Show {
        #[arg(long, short = 'k')]
        kind: KindArg,

        /// Logical document name
        name: String,

        /// Document directory (default: from settings)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Print secret values instead of redacting them
        #[arg(long)]
        reveal: bool,
    },

    /// Show a document by instance id
    Get {
        #[arg(long, short = 'k')]
        kind: KindArg,

        /// Instance id
        id: String,

        /// Document directory (default: from settings)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Print secret values instead of redacting them
        #[arg(long)]
        reveal: bool,
    },

    /// Load every configured directory and report problems
    Check,

    /// Print the effective settings
    Settings,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let effective = match load_settings(cli.settings, cli.strict) {
        Ok(effective) => effective,
        Err(e) => {
            eprintln!("Settings error: {}", e);
            process::exit(1);
        }
    };
    let settings = effective.settings();

    match cli.command {
        Commands::Resolve { kind, dir, json } => {
            let dir = kind.directory(settings, dir);
            match kind {
                KindArg::AgentProfile => run_resolve::<AgentProfile>(settings, &dir, json),
                KindArg::LlmConfig => run_resolve::<LlmConfig>(settings, &dir, json),
            }
        }
        Commands::Show {
            kind,
            name,
            dir,
            reveal,
        } => {
            let dir = kind.directory(settings, dir);
            match kind {
                KindArg::AgentProfile => run_show::<AgentProfile>(settings, &dir, &name, reveal),
                KindArg::LlmConfig => run_show::<LlmConfig>(settings, &dir, &name, reveal),
            }
        }
        Commands::Get {
            kind,
            id,
            dir,
            reveal,
        } => {
            let dir = kind.directory(settings, dir);
            match kind {
                KindArg::AgentProfile => run_get::<AgentProfile>(settings, &dir, &id, reveal),
                KindArg::LlmConfig => run_get::<LlmConfig>(settings, &dir, &id, reveal),
            }
        }
        Commands::Check => run_check(settings),
        Commands::Settings => run_settings(&effective),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<PathBuf>, strict: bool) -> Result<EffectiveSettings, String> {
    let project = match path {
        Some(path) if !path.exists() => {
            return Err(format!("settings file not found: {}", path.display()));
        }
        Some(path) => path,
        None => PathBuf::from(PROJECT_SETTINGS_FILE),
    };
    let host = EffectiveSettings::default_host_path();
    let cli = strict.then(|| json!({ "strict": true }));

    EffectiveSettings::build(host.as_deref(), Some(&project), cli).map_err(|e| e.to_string())
}

fn load<K: DocumentKind>(settings: &RegistrySettings, dir: &Path) -> Snapshot<K> {
    match load_and_resolve::<K>(dir, &settings.load_options()) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Load error: {}", e);
            process::exit(1);
        }
    }
}

fn run_resolve<K: DocumentKind>(settings: &RegistrySettings, dir: &Path, json: bool) {
    let snapshot = load::<K>(settings, dir);

    if json {
        let documents: Vec<Value> = snapshot
            .iter()
            .map(|(id, doc)| {
                json!({
                    "id": id,
                    "name": doc.get(NAME_KEY),
                    "rev": doc.get(REV_KEY),
                    "base": doc.get(K::BASE_KEY),
                    "source": snapshot.source_of(id).map(|s| &s.path),
                })
            })
            .collect();
        let output = json!({
            "kind": K::LABEL,
            "directory": snapshot.report().directory,
            "documents": documents,
            "problems": problems(snapshot.report()),
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_summary(&snapshot);
    }

    if !snapshot.report().is_clean() {
        process::exit(1);
    }
}

fn run_show<K: DocumentKind>(
    settings: &RegistrySettings,
    dir: &Path,
    name: &str,
    reveal: bool,
) {
    let snapshot = load::<K>(settings, dir);
    match snapshot.latest_active_by_name(name) {
        Some(document) => print_document(document, reveal),
        None => {
            eprintln!("No active {} named '{}'", K::LABEL, name);
            process::exit(1);
        }
    }
}

fn run_get<K: DocumentKind>(
    settings: &RegistrySettings,
    dir: &Path,
    id: &str,
    reveal: bool,
) {
    let snapshot = load::<K>(settings, dir);
    match snapshot.get_copy_by_id(id) {
        Some(document) => print_document(document, reveal),
        None => {
            eprintln!("No {} with id '{}'", K::LABEL, id);
            process::exit(1);
        }
    }
}

fn run_check(settings: &RegistrySettings) {
    let registries = match Registries::open(settings) {
        Ok(registries) => registries,
        Err(e) => {
            eprintln!("Load error: {}", e);
            process::exit(1);
        }
    };

    let profiles = registries.agent_profiles.snapshot();
    let llm_configs = registries.llm_configs.snapshot();
    print_summary(&profiles);
    println!();
    print_summary(&llm_configs);

    if !profiles.report().is_clean() || !llm_configs.report().is_clean() {
        process::exit(1);
    }
}

fn run_settings(effective: &EffectiveSettings) {
    match effective.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing settings: {}", e);
            process::exit(1);
        }
    }
}

fn print_document(document: Document, reveal: bool) {
    let mut value = Value::Object(document);
    if !reveal {
        redact_secrets(&mut value);
    }
    match serde_json::to_string_pretty(&value) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error serializing document: {}", e);
            process::exit(1);
        }
    }
}

fn print_summary<K: DocumentKind>(snapshot: &Snapshot<K>) {
    let report = snapshot.report();
    println!(
        "{}: {} document(s) from {}",
        K::LABEL,
        snapshot.len(),
        report.directory.display()
    );

    for (id, doc) in snapshot.iter() {
        println!(
            "  {}  {}  rev {}  base {}",
            id,
            display_field(doc, NAME_KEY),
            display_field(doc, REV_KEY),
            display_field(doc, K::BASE_KEY),
        );
    }

    let issues = problems(report);
    if !issues.is_empty() {
        println!("  Problems:");
        for problem in issues {
            println!("    {}", problem);
        }
    }
}

fn display_field(doc: &Document, key: &str) -> String {
    match doc.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn problems(report: &LoadReport) -> Vec<String> {
    let mut problems = Vec::new();
    if report.directory_missing {
        problems.push(format!("directory not found: {}", report.directory.display()));
    }
    for skipped in &report.skipped {
        problems.push(format!("skipped {}: {}", skipped.path.display(), skipped.reason));
    }
    for duplicate in &report.duplicates {
        problems.push(format!(
            "duplicate name '{}': {} replaced by {}",
            duplicate.name,
            duplicate.replaced.display(),
            duplicate.kept.display()
        ));
    }
    for failure in &report.failures {
        problems.push(format!("{}: {}", failure.name, failure.error));
    }
    problems
}
