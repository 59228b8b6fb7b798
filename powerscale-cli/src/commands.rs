//! Subcommand implementations

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use log::warn;

use powerscale_core::diagnostics::{Diagnostic, Diagnostics};
use powerscale_core::differ::create_plan;
use powerscale_core::graph::{self, BindingMap};
use powerscale_core::interpreter::{ApplyResult, EffectOutcome, Interpreter};
use powerscale_core::plan::Plan;
use powerscale_core::provider::Provider;
use powerscale_core::resource::ResourceId;
use powerscale_provider::PowerScaleProvider;
use powerscale_state::{LockInfo, StateBackend, StateFile, create_backend};

use crate::display::{SENSITIVE, print_attributes, print_diagnostics, print_plan};
use crate::refresh::refresh;
use crate::workspace::{Workspace, schema_map};

pub fn run_validate(file: &Path) -> Result<()> {
    let mut workspace = Workspace::load(file)?;
    println!("{}", "Validating...".cyan());
    check(workspace.prepare())?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            workspace.resources.len()
        )
        .green()
        .bold()
    );
    for resource in &workspace.resources {
        println!("  • {}", resource.id);
    }
    Ok(())
}

pub async fn run_plan(file: &Path) -> Result<()> {
    let workspace = load_prepared(file)?;
    let provider = connect(&workspace)?;
    let backend = workspace.backend()?;

    let mut state_file = read_state(backend.as_ref()).await?;
    check(refresh(&provider, &workspace.schemas, &mut state_file).await)?;
    let (plan, _) = build_plan(&provider, &workspace, &state_file).await?;
    print_plan(&plan, &workspace.schemas);
    Ok(())
}

pub async fn run_apply(file: &Path, auto_approve: bool) -> Result<()> {
    let workspace = load_prepared(file)?;
    let provider = connect(&workspace)?;
    let backend = workspace.backend()?;

    let lock = acquire(backend.as_ref(), "apply").await?;
    let result = apply(&workspace, provider, backend.as_ref(), auto_approve).await;
    release(backend.as_ref(), &lock).await;
    result
}

pub async fn run_destroy(file: &Path, auto_approve: bool) -> Result<()> {
    let workspace = load_prepared(file)?;
    let provider = connect(&workspace)?;
    let backend = workspace.backend()?;

    let lock = acquire(backend.as_ref(), "destroy").await?;
    let result = destroy(&workspace, provider, backend.as_ref(), auto_approve).await;
    release(backend.as_ref(), &lock).await;
    result
}

pub async fn run_import(file: &Path, resource_type: &str, name: &str, import_id: &str) -> Result<()> {
    let workspace = load_prepared(file)?;
    let id = ResourceId::new(resource_type, name);
    let declared = workspace
        .resources
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow!("{} is not declared in {}", id, file.display()))?;
    if declared.is_data_source() {
        bail!("{} is a data source and cannot be imported", id);
    }

    let provider = connect(&workspace)?;
    let backend = workspace.backend()?;

    let lock = acquire(backend.as_ref(), "import").await?;
    let result = import(&workspace, &provider, backend.as_ref(), &id, import_id).await;
    release(backend.as_ref(), &lock).await;
    result
}

pub async fn run_state_list(file: &Path) -> Result<()> {
    let backend = load_backend(file)?;
    match backend.read_state().await.context("Failed to read state")? {
        Some(state_file) if !state_file.resources.is_empty() => {
            for resource in &state_file.resources {
                println!("{}", resource.id());
            }
        }
        _ => println!("{}", format!("No resources in {}", backend.location()).yellow()),
    }
    Ok(())
}

pub async fn run_state_show(file: &Path, resource_type: &str, name: &str, json: bool) -> Result<()> {
    let backend = load_backend(file)?;
    let state_file = read_state(backend.as_ref()).await?;
    let id = ResourceId::new(resource_type, name);
    let entry = state_file
        .find_resource(resource_type, name)
        .ok_or_else(|| anyhow!("{} is not in the state", id))?;

    let schemas = schema_map();
    let schema = schemas.get(resource_type);

    if json {
        let mut masked = entry.clone();
        for (key, value) in masked.attributes.iter_mut() {
            if schema.is_some_and(|s| s.is_sensitive(key)) {
                *value = serde_json::Value::String(SENSITIVE.to_string());
            }
        }
        let text = serde_json::to_string_pretty(&masked).context("Failed to format state")?;
        println!("{}", text);
    } else {
        println!("{}", id.to_string().cyan().bold());
        print_attributes(entry.identifier.as_deref(), &entry.to_state().attributes, schema);
    }
    Ok(())
}

pub async fn run_force_unlock(file: &Path, lock_id: &str) -> Result<()> {
    let backend = load_backend(file)?;
    backend
        .force_unlock(lock_id)
        .await
        .context("Failed to unlock state")?;
    println!("{}", "State has been unlocked.".green().bold());
    Ok(())
}

async fn apply<P: Provider>(
    workspace: &Workspace,
    provider: P,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<()> {
    let mut state_file = read_state(backend).await?;
    let before = state_file.resources.clone();
    check(refresh(&provider, &workspace.schemas, &mut state_file).await)?;

    let (plan, mut bindings) = build_plan(&provider, workspace, &state_file).await?;
    print_plan(&plan, &workspace.schemas);
    if plan.has_no_changes() {
        if state_file.resources != before {
            save(backend, &mut state_file).await?;
        }
        return Ok(());
    }

    println!();
    if !auto_approve && !confirm("Do you want to apply these changes?")? {
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Applying changes...".cyan().bold());
    println!();
    let result = Interpreter::new(provider).apply(&plan, &mut bindings).await;
    let diagnostics = record(&result, &mut state_file);
    save(backend, &mut state_file).await?;
    summarize("Apply", &result);
    check(diagnostics)
}

async fn destroy<P: Provider>(
    workspace: &Workspace,
    provider: P,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<()> {
    let mut state_file = read_state(backend).await?;
    let before = state_file.resources.clone();
    check(refresh(&provider, &workspace.schemas, &mut state_file).await)?;

    let plan = create_plan(
        &[],
        &state_file.state_map(),
        &workspace.schemas,
        &state_file.states(),
    );
    if plan.is_empty() {
        println!("{}", "No resources to destroy.".green());
        if state_file.resources != before {
            save(backend, &mut state_file).await?;
        }
        return Ok(());
    }

    print_plan(&plan, &workspace.schemas);
    println!();
    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();
    let result = Interpreter::new(provider)
        .apply(&plan, &mut BindingMap::new())
        .await;
    let diagnostics = record(&result, &mut state_file);
    save(backend, &mut state_file).await?;
    summarize("Destroy", &result);
    check(diagnostics)
}

async fn import<P: Provider>(
    workspace: &Workspace,
    provider: &P,
    backend: &dyn StateBackend,
    id: &ResourceId,
    import_id: &str,
) -> Result<()> {
    let mut state_file = read_state(backend).await?;
    if state_file
        .find_resource(&id.resource_type, &id.name)
        .is_some()
    {
        bail!("{} is already managed; remove it from the state before importing", id);
    }

    let state = match provider.import(id, import_id).await {
        Ok(state) => state,
        Err(e) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(Diagnostic::from(&e));
            return check(diagnostics);
        }
    };
    if !state.exists {
        bail!("Cannot import non-existent remote object '{}'", import_id);
    }

    state_file.record(&state);
    save(backend, &mut state_file).await?;

    println!(
        "{}",
        format!("✓ Imported {}", id).green().bold()
    );
    print_attributes(
        state.identifier.as_deref(),
        &state.attributes,
        workspace.schemas.get(&id.resource_type),
    );
    println!();
    println!("Run `powerscale plan` to compare it with the configuration.");
    Ok(())
}

/// Read data sources, resolve references and diff against `state_file`
async fn build_plan<P: Provider>(
    provider: &P,
    workspace: &Workspace,
    state_file: &StateFile,
) -> Result<(Plan, BindingMap)> {
    let states = state_file.state_map();
    let mut bindings = graph::build_binding_map(&workspace.resources, &states);

    for resource in workspace.resources.iter().filter(|r| r.is_data_source()) {
        let resolved = graph::resolve_resource(resource, &bindings);
        match provider.read(&resolved.id, None, &resolved.attributes).await {
            Ok(state) => graph::update_binding(&mut bindings, resource, &state),
            Err(e) => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.push(Diagnostic::from(&e));
                check(diagnostics)?;
            }
        }
    }

    let desired: Vec<_> = workspace
        .resources
        .iter()
        .map(|r| graph::resolve_resource(r, &bindings))
        .collect();
    let plan = create_plan(&desired, &states, &workspace.schemas, &state_file.states());
    Ok((plan, bindings))
}

/// Print each outcome and fold it into the state file
fn record(result: &ApplyResult, state_file: &mut StateFile) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for (id, outcome) in &result.outcomes {
        match outcome {
            Ok(EffectOutcome::Created { state }) => {
                println!("  {} Created {}", "✓".green(), id);
                state_file.record(state);
            }
            Ok(EffectOutcome::Updated { state }) => {
                println!("  {} Updated {}", "✓".green(), id);
                state_file.record(state);
            }
            Ok(EffectOutcome::Deleted { id }) => {
                println!("  {} Deleted {}", "✓".green(), id);
                state_file.remove_resource(&id.resource_type, &id.name);
            }
            Ok(EffectOutcome::Read { .. }) => println!("  {} Read {}", "✓".green(), id),
            Ok(EffectOutcome::Skipped { reason }) => {
                println!("  {} Skipped {} ({})", "-".dimmed(), id, reason)
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), id, e.message);
                diagnostics.push(Diagnostic::from(e));
            }
        }
    }
    println!();
    diagnostics
}

fn summarize(action: &str, result: &ApplyResult) {
    if result.is_success() {
        println!(
            "{}",
            format!("{} complete! {} operations succeeded.", action, result.success_count)
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!(
                "{} failed. {} succeeded, {} failed.",
                action, result.success_count, result.failure_count
            )
            .red()
            .bold()
        );
    }
}

fn load_prepared(file: &Path) -> Result<Workspace> {
    let mut workspace = Workspace::load(file)?;
    check(workspace.prepare())?;
    Ok(workspace)
}

/// Backend named by the configuration, or the default when there is none
fn load_backend(file: &Path) -> Result<Box<dyn StateBackend>> {
    if file.exists() {
        Workspace::load(file)?.backend()
    } else {
        create_backend(None).context("Invalid backend configuration")
    }
}

fn connect(workspace: &Workspace) -> Result<PowerScaleProvider> {
    workspace.provider().map_err(|diagnostics| {
        print_diagnostics(&diagnostics);
        anyhow!("Invalid provider configuration")
    })
}

/// Print diagnostics; fail if any is an error
fn check(diagnostics: Diagnostics) -> Result<()> {
    print_diagnostics(&diagnostics);
    if diagnostics.has_errors() {
        bail!("{} error(s) reported", diagnostics.error_count());
    }
    Ok(())
}

async fn read_state(backend: &dyn StateBackend) -> Result<StateFile> {
    Ok(backend
        .read_state()
        .await
        .with_context(|| format!("Failed to read state from {}", backend.location()))?
        .unwrap_or_default())
}

async fn save(backend: &dyn StateBackend, state_file: &mut StateFile) -> Result<()> {
    state_file.increment_serial();
    backend
        .write_state(state_file)
        .await
        .with_context(|| format!("Failed to write state to {}", backend.location()))
}

async fn acquire(backend: &dyn StateBackend, operation: &str) -> Result<LockInfo> {
    backend
        .acquire_lock(operation)
        .await
        .context("Failed to acquire the state lock")
}

async fn release(backend: &dyn StateBackend, lock: &LockInfo) {
    if let Err(e) = backend.release_lock(lock).await {
        warn!("releasing lock {} failed: {}", lock.id, e);
        eprintln!(
            "{} the state lock could not be released. Run `powerscale force-unlock {}`.",
            "Warning:".yellow().bold(),
            lock.id
        );
    }
}

fn confirm(question: &str) -> Result<bool> {
    println!("{}", question.yellow().bold());
    println!("  {}", "Only 'yes' will be accepted to approve.".yellow());
    print!("\n  Enter a value: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    println!();
    Ok(input.trim() == "yes")
}
