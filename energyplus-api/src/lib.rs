//! EnergyPlus Runtime API Bindings
//!
//! Safe Rust bindings for the runtime portion of the EnergyPlus C API: run a
//! simulation and hook into the engine's lifecycle callbacks.
//!
//! # Architecture
//!
//! This library is intentionally thin:
//! - Resolves the run entry point and the 16 callback registration entry
//!   points from a loaded library
//! - Bridges Rust closures to the engine's `void (*)()` callbacks through
//!   static per-hook trampolines
//! - Reports handler panics and nonzero run statuses as typed errors
//!
//! The library does NOT:
//! - Model any part of the simulation (that is the engine's job)
//! - Search for or locate the EnergyPlus shared library
//! - Read simulation input or output files
//!
//! # Example Usage
//!
//! ```no_run
//! use energyplus_api::{CallbackHook, Library, Runtime};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! let library = unsafe { Library::new("libenergyplusapi.so") }.unwrap();
//! let mut runtime = Runtime::new(&library).unwrap();
//!
//! let timesteps = Arc::new(AtomicU64::new(0));
//! let counter = Arc::clone(&timesteps);
//! runtime.register_callback_new_timestep(move || {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! runtime.register_callback(CallbackHook::AfterHvacManagers, || {
//!     // Inspect or override HVAC state here
//! });
//!
//! runtime.run("/tmp/simulation").unwrap();
//! println!("Zone timesteps: {}", timesteps.load(Ordering::Relaxed));
//! ```

// Public modules
pub mod config;
pub mod runtime;
pub mod types;

// Re-export main types for convenience
pub use config::{CallbackPanicPolicy, RuntimeOptions};
pub use ffi::{CallbackFn, RegisterFn, RunFn, SymbolSource, RUN_SYMBOL};
pub use libloading::Library;
pub use runtime::Runtime;
pub use types::{CallbackHook, CallbackStats, Result, RuntimeError, HOOK_COUNT};

// Internal modules (not exposed in public API)
mod dispatch;
mod ffi;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
