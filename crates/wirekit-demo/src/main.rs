#![forbid(unsafe_code)]

//! Walkthrough of a container wiring three emitters.
//!
//! `first` depends on `second`. `third` listens to `fire` on `first` and is
//! registered after the first `wire_all`, so the second pass connects it.
//! With `--late`, `second` is registered only after the first pass, which
//! defers `first` until the late pass picks it up.

use std::cell::Cell;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wirekit::{
    Component, Container, ContainerOptions, DependencyMap, MethodTable, ObjectRef, WireError,
    handler_fn, same_object,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Wire emitters together and fire events through them")]
struct Args {
    /// Trace every wiring decision.
    #[arg(long)]
    verbose: bool,

    /// Container options as JSON, e.g. '{"declaration_field": "deps"}'.
    #[arg(long)]
    options: Option<String>,

    /// Declaration of `third` as JSON. Defaults to '{"first": {"fire": "on_fire"}}'.
    #[arg(long)]
    declaration: Option<String>,

    /// Number of `fire` events emitted on `first`.
    #[arg(long, default_value_t = 1)]
    fires: u32,

    /// Register `second` only after the first pass.
    #[arg(long)]
    late: bool,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("invalid options: {0}")]
    Options(#[source] serde_json::Error),
    #[error("invalid declaration: {0}")]
    Declaration(#[source] serde_json::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
}

fn options(args: &Args) -> Result<ContainerOptions, DemoError> {
    let options = match &args.options {
        Some(json) => ContainerOptions::from_json(json).map_err(DemoError::Options)?,
        None => ContainerOptions::default(),
    };
    let verbose = options.verbose || args.verbose;
    Ok(options.with_verbose(verbose))
}

fn run(args: &Args) -> Result<(), DemoError> {
    let options = options(args)?;
    let field = options.declaration_field.clone();
    let mut container = Container::new(options);

    let first = Rc::new(Component::new());
    let second = Rc::new(Component::new());
    first
        .slot_ref()
        .declare(field.as_str(), DependencyMap::new().wire("second"));
    first.set_on_wire_late(Some(|name: &str| {
        tracing::info!(dependency = name, "first connected late");
    }));

    container.add("first", first.clone())?;
    if !args.late {
        container.add("second", second.clone())?;
    }
    container.wire_all()?;
    tracing::info!(pending = container.late().len(), "first pass done");

    if args.late {
        container.add("second", second.clone())?;
    }

    let fired = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&fired);
    let methods = MethodTable::new().with(
        "on_fire",
        handler_fn(move |_, _| counter.set(counter.get() + 1)),
    );
    let third = Rc::new(Component::with_methods(methods));
    let declaration = match &args.declaration {
        Some(json) => DependencyMap::from_json(json).map_err(DemoError::Declaration)?,
        None => DependencyMap::new().on("first", "fire", "on_fire"),
    };
    container.add_with("third", third.clone(), &declaration)?;
    container.wire_all()?;
    tracing::info!(pending = container.late().len(), "second pass done");

    let second_ref: ObjectRef = second;
    let linked = first
        .slot_ref()
        .dependency("second")
        .is_some_and(|held| same_object(&*held, &*second_ref));
    for _ in 0..args.fires {
        first.emit("fire", &());
    }

    println!("first -> second: {linked}");
    println!("third -> first: {}", third.slot_ref().has_dependency("first"));
    println!("fire handled {} of {} times", fired.get(), args.fires);

    container.clear()?;
    println!(
        "after clear: {} objects, {} listeners on first",
        container.len(),
        first.emitter().total_listeners()
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "demo failed");
            ExitCode::FAILURE
        }
    }
}
