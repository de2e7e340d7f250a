//! Warden entry point.
//!
//! `check` compiles the schema namespaces and reports the resulting model;
//! `plan` loads expected and current state from files and prints the diff
//! each kind would apply; `run` drives the full controller pipeline with
//! file-backed event sources against an in-memory client.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_controller::{ControllerConfig, EventSource, ReconcileLoop, spawn_watchers};
use warden_engine::{IdLookup, compare_entities, resolve_references};
use warden_schema::{Direction, EntityModel, SchemaRegistry};
use warden_state::{EntityCollection, EntityLoader, NoFiles, NoSecrets};

mod cli;
mod client;
mod source;

use cli::{Cli, Commands};
use client::MemoryClient;
use source::FileSource;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut registry = SchemaRegistry::new(&cli.schema_dir);
    let model = EntityModel::compile(&mut registry, &cli.namespaces)
        .with_context(|| format!("compiling schemas from {}", cli.schema_dir.display()))?;
    info!(kinds = model.apply_order().len(), "entity model compiled");

    match cli.command {
        Commands::Check { detailed } => check(&model, detailed),
        Commands::Plan {
            expected,
            current,
            compare_secrets,
        } => plan(&model, &expected, current.as_deref(), compare_secrets),
        Commands::Run {
            expected,
            current,
            quiescence_ms,
            compare_secrets,
        } => {
            run(
                &model,
                &expected,
                current.as_deref(),
                quiescence_ms,
                compare_secrets,
            )
            .await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warden=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Print the compiled model: kinds in apply order, optionally with fields.
fn check(model: &EntityModel, detailed: bool) -> Result<()> {
    println!("apply order:");
    for (position, kind) in model.apply_order().iter().enumerate() {
        println!("  {}. {kind}", position + 1);
    }
    println!();
    for descriptor in model.descriptors().values() {
        if !descriptor.is_top_level() {
            continue;
        }
        let path = descriptor.api_path.as_deref().unwrap_or("-");
        println!("{} (api path: {path})", descriptor.kind);
        if !detailed {
            continue;
        }
        for field in &descriptor.fields {
            let mut flags = Vec::new();
            if field.required {
                flags.push("required");
            }
            if field.default.has_default() {
                flags.push("default");
            }
            if field.secret {
                flags.push("secret");
            }
            if !field.eq {
                flags.push("no-eq");
            }
            println!("  {}: {:?} [{}]", field.name, field.kind, flags.join(", "));
        }
    }
    Ok(())
}

/// Diff expected against current state from files and print per-kind plans.
///
/// Follows the same kind order and id propagation as a live pass, so
/// references across kinds resolve exactly as they would against a cluster.
fn plan(
    model: &EntityModel,
    expected_path: &Path,
    current_path: Option<&Path>,
    compare_secrets: bool,
) -> Result<()> {
    let loader = EntityLoader::new(model, &NoSecrets, &NoFiles);

    let mut expected = load_state_file(&loader, expected_path, Direction::Cluster)?;
    let current = match current_path {
        Some(path) => load_state_file(&loader, path, Direction::Remote)?,
        None => BTreeMap::new(),
    };

    let mut lookup = IdLookup::new();
    let mut pending = 0usize;
    for kind in model.apply_order() {
        let descriptor = model
            .descriptor(kind)
            .with_context(|| format!("kind '{kind}' missing from model"))?;
        let expected_kind = expected
            .entry(kind.clone())
            .or_insert_with(|| EntityCollection::new(kind.clone()));
        if let Some(conflicts) = resolve_references(descriptor, expected_kind, &lookup) {
            println!("{kind}: skipped, unresolved references:");
            for (name, missing) in conflicts {
                println!("  {name}: {}", missing.join(", "));
            }
            continue;
        }

        let empty = EntityCollection::new(kind.clone());
        let current_kind = current.get(kind.as_str()).unwrap_or(&empty);
        let diff = compare_entities(current_kind, expected_kind, descriptor, compare_secrets);
        for entity in diff.share.iter().chain(diff.modify.iter()) {
            expected_kind.set_id(&entity.name, entity.id.clone());
        }
        lookup.insert(kind.clone(), expected_kind.ids_by_name());

        pending += diff.operation_count();
        println!("{diff}");
    }

    if pending == 0 {
        println!("\nconverged: nothing to apply");
    } else {
        println!("\n{pending} pending operation(s)");
    }
    Ok(())
}

/// Drive the controller pipeline: file-backed watch sources feed the
/// shared queue, the reconcile loop diffs and applies against an
/// in-memory client seeded from the current-state file.
async fn run(
    model: &EntityModel,
    expected_path: &Path,
    current_path: Option<&Path>,
    quiescence_ms: u64,
    compare_secrets: bool,
) -> Result<()> {
    let loader = EntityLoader::new(model, &NoSecrets, &NoFiles);
    let current = match current_path {
        Some(path) => load_state_file(&loader, path, Direction::Remote)?,
        None => BTreeMap::new(),
    };
    let client = MemoryClient::new(current);

    let text = fs::read_to_string(expected_path)
        .with_context(|| format!("reading state file {}", expected_path.display()))?;
    let doc: BTreeMap<String, Vec<serde_json::Value>> = serde_json::from_str(&text)
        .with_context(|| format!("parsing state file {}", expected_path.display()))?;
    let sources: Vec<Box<dyn EventSource>> = doc
        .into_iter()
        .map(|(kind, payloads)| Box::new(FileSource::new(kind, payloads)) as Box<dyn EventSource>)
        .collect();

    let config = ControllerConfig {
        quiescence: Duration::from_millis(quiescence_ms),
        compare_secrets,
        ..ControllerConfig::default()
    };
    let (tx, rx) = config.event_channel();
    let watchers = spawn_watchers(sources, &tx);
    drop(tx);

    ReconcileLoop::new(model, &NoSecrets, &NoFiles, &client, config, rx)
        .run()
        .await
        .context("reconcile loop failed")?;
    for watcher in watchers {
        watcher.await.context("watch task failed")?;
    }

    for (kind, count) in client.summary() {
        println!("{kind}: {count} entities");
    }
    Ok(())
}

/// Read a `{ "<Kind>": [payload, ...] }` JSON file into collections.
fn load_state_file(
    loader: &EntityLoader<'_>,
    path: &Path,
    direction: Direction,
) -> Result<BTreeMap<String, EntityCollection>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading state file {}", path.display()))?;
    let doc: BTreeMap<String, Vec<serde_json::Value>> = serde_json::from_str(&text)
        .with_context(|| format!("parsing state file {}", path.display()))?;

    let mut state = BTreeMap::new();
    for (kind, payloads) in doc {
        let mut collection = EntityCollection::new(kind.clone());
        for payload in &payloads {
            let entity = loader
                .load(&kind, payload, direction)
                .with_context(|| format!("loading '{kind}' entity from {}", path.display()))?;
            collection.apply(entity, warden_state::EntityOp::Add);
        }
        state.insert(kind, collection);
    }
    Ok(state)
}
