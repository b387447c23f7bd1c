//! Resolve a module manifest and print the resulting namespaces.
//!
//! The manifest is a TOML file with one `[[module]]` table per unit:
//!
//!   [[module]]
//!   key = "config"
//!   value = { greeting = "hello" }
//!
//!   [[module]]
//!   key = "app"
//!   depends = ["config:greeting"]
//!
//! Units with neither `value` nor `text` stay pending until the engine
//! escalates and acquires their source from the source directory.
//!
//! Usage:
//!   resolve-manifest <manifest.toml> [--config engine.toml] [--source-dir dir] [--pretty]

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use quiver::{Definition, FsAcquirer, Resolver, ResolverConfig, ScheduleMode, Value};

#[derive(Parser, Debug)]
struct Args {
    /// Module manifest to resolve
    manifest: PathBuf,

    /// Engine configuration file; immediate mode when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory module sources are acquired from; the manifest's directory
    /// when omitted
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Wait limit for deferred-mode resolution, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    module: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    key: String,
    #[serde(default)]
    depends: Vec<String>,
    value: Option<toml::Value>,
    text: Option<String>,
}

/// TOML carries datetimes, which the value model does not; they become text.
fn toml_to_json(value: &toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s.clone()),
        toml::Value::Integer(n) => serde_json::Value::from(*n),
        toml::Value::Float(f) => serde_json::Value::from(*f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(*b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .iter()
                .map(|(key, item)| (key.clone(), toml_to_json(item)))
                .collect(),
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resolve_manifest=info,quiver=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ResolverConfig::from_file(path)?,
        None => ResolverConfig::immediate(),
    };
    config.validate()?;
    let deferred = config.mode == ScheduleMode::Deferred;

    let source_dir = args.source_dir.clone().unwrap_or_else(|| {
        args.manifest
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let manifest_text = std::fs::read_to_string(&args.manifest)?;
    let manifest: Manifest = toml::from_str(&manifest_text)?;
    info!(
        "resolving {} modules from {}",
        manifest.module.len(),
        args.manifest.display()
    );

    let resolver = Resolver::builder()
        .config(config)
        .acquirer(Arc::new(FsAcquirer::new(source_dir)))
        .build();

    let completion = if deferred {
        let (tx, rx) = tokio::sync::oneshot::channel();
        resolver.on_complete(move || {
            let _ = tx.send(());
        });
        Some(rx)
    } else {
        None
    };

    let mut keys = Vec::new();
    for entry in manifest.module {
        if entry.value.is_some() && entry.text.is_some() {
            warn!("module '{}' declares both value and text; using value", entry.key);
        }
        let mut definition = Definition::named(entry.key.clone()).dependencies(&entry.depends);
        if let Some(value) = &entry.value {
            definition = definition.value(Value::from_json(&toml_to_json(value)));
        } else if let Some(text) = entry.text {
            definition = definition.source_text(text);
        }
        keys.push(entry.key);
        resolver.define(definition);
    }

    if let Some(rx) = completion {
        tokio::select! {
            _ = rx => {}
            _ = sleep(Duration::from_millis(args.timeout_ms)) => {
                warn!("resolution incomplete after {} ms", args.timeout_ms);
            }
        }
    }

    let status = resolver.status();
    let completed = status.completed;
    info!(
        "{} modules loaded, {} pending",
        status.loaded,
        status.pending.len()
    );

    let mut modules = serde_json::Map::new();
    for key in &keys {
        let value = resolver
            .lookup(key)
            .map(|value| value.to_json())
            .unwrap_or(serde_json::Value::Null);
        modules.insert(key.clone(), value);
    }
    let report = serde_json::json!({
        "status": status,
        "modules": serde_json::Value::Object(modules),
    });
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", rendered);

    if !completed {
        std::process::exit(1);
    }
    Ok(())
}
