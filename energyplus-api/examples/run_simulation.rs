//! Run an EnergyPlus simulation through the runtime API
//!
//! Loads the EnergyPlus API shared library, counts environments and zone
//! timesteps through lifecycle callbacks, and runs one simulation directory.
//!
//! Usage:
//!   run_simulation <path/to/libenergyplusapi> <run_dir> [--keep-invoking]
//!
//! Example:
//!   RUST_LOG=debug run_simulation /opt/EnergyPlus/libenergyplusapi.so ./5ZoneAirCooled

use anyhow::{Context, Result};
use energyplus_api::{CallbackHook, CallbackPanicPolicy, Library, Runtime, RuntimeOptions};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <path/to/libenergyplusapi> <run_dir> [--keep-invoking]", args[0]);
        std::process::exit(1);
    }

    let library_path = PathBuf::from(&args[1]);
    let run_dir = PathBuf::from(&args[2]);
    let keep_invoking = args.iter().skip(3).any(|a| a == "--keep-invoking");

    println!("EnergyPlus runtime bindings v{}", energyplus_api::VERSION);
    println!("Library: {:?}", library_path);
    println!("Run directory: {:?}\n", run_dir);

    // SAFETY: loading runs the library's initializers; the caller vouches for it.
    let library = unsafe { Library::new(&library_path) }
        .with_context(|| format!("Failed to load EnergyPlus library: {:?}", library_path))?;

    let mut options = RuntimeOptions::new();
    if keep_invoking {
        options = options.with_panic_policy(CallbackPanicPolicy::KeepInvoking);
    }
    let mut runtime = Runtime::with_options(&library, options)
        .context("Library does not export the EnergyPlus runtime API")?;

    let environments = Arc::new(AtomicU64::new(0));
    let timesteps = Arc::new(AtomicU64::new(0));

    let counter = Arc::clone(&environments);
    runtime.register_callback_new_environment(move || {
        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
        println!("  → environment #{}", n);
    });

    let counter = Arc::clone(&timesteps);
    runtime.register_callback_new_timestep(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    runtime.register_callback(CallbackHook::BeginNewEnvironmentAfterWarmUp, || {
        println!("    warm-up converged");
    });

    let status = runtime
        .run_energyplus(&run_dir)
        .with_context(|| format!("Simulation in {:?} did not complete cleanly", run_dir))?;

    println!("\n=== RUN SUMMARY ===");
    println!("Exit status: {}", status);
    println!("Environments: {}", environments.load(Ordering::Relaxed));
    println!("Zone timesteps: {}", timesteps.load(Ordering::Relaxed));
    println!("Callback firings by hook:");
    for (hook, count) in runtime.last_run_stats().fired() {
        println!("  {}: {}", hook, count);
    }

    if status != 0 {
        anyhow::bail!("EnergyPlus exited with status {}", status);
    }

    Ok(())
}
