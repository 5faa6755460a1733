//! The runtime adapter
//!
//! [`Runtime`] binds to a loaded EnergyPlus library, registers lifecycle
//! callbacks with it, and runs simulations.

use crate::config::RuntimeOptions;
use crate::dispatch::{self, DispatchClaim};
use crate::ffi::{NativeApi, SymbolSource};
use crate::types::{CallbackHook, CallbackStats, Result, RuntimeError};
use std::ffi::CString;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Adapter over the EnergyPlus runtime C API
///
/// Borrows the library it was built from, so it cannot outlive it. Only one
/// adapter may exist per process at a time, because the callback trampolines
/// handed to the library are process-wide.
///
/// # Example
///
/// ```no_run
/// use energyplus_api::{Library, Runtime};
///
/// let library = unsafe { Library::new("libenergyplusapi.so") }.unwrap();
/// let mut runtime = Runtime::new(&library).unwrap();
///
/// runtime.register_callback_new_environment(|| println!("New environment"));
/// let status = runtime.run_energyplus("/tmp/simulation").unwrap();
/// assert_eq!(status, 0);
/// ```
pub struct Runtime<'lib> {
    api: NativeApi,
    claim: DispatchClaim,
    options: RuntimeOptions,
    last_run: CallbackStats,
    _library: PhantomData<&'lib ()>,
}

impl<'lib> Runtime<'lib> {
    /// Bind to `library` with default options
    ///
    /// Resolves all 17 entry points up front. Nothing in the library is
    /// called.
    pub fn new<L: SymbolSource + ?Sized>(library: &'lib L) -> Result<Self> {
        Self::with_options(library, RuntimeOptions::default())
    }

    /// Bind to `library` with explicit options
    pub fn with_options<L: SymbolSource + ?Sized>(
        library: &'lib L,
        options: RuntimeOptions,
    ) -> Result<Self> {
        let api = NativeApi::resolve(library)?;
        let claim = dispatch::claim(&options)?;
        log::info!("EnergyPlus runtime API bound");

        Ok(Self {
            api,
            claim,
            options,
            last_run: CallbackStats::default(),
            _library: PhantomData,
        })
    }

    /// Run a simulation in `path` and return the engine's status code
    ///
    /// Blocks until the simulation finishes. Registered handlers fire on
    /// this thread while the call is in progress. The status is returned
    /// exactly as the engine reported it; 0 means success.
    ///
    /// If any handler panicked during the run, the run still completes and
    /// [`RuntimeError::CallbackPanicked`] is returned with the status attached.
    pub fn run_energyplus(&mut self, path: impl AsRef<Path>) -> Result<i32> {
        let path = path.as_ref();
        let c_path = path_to_cstring(path)?;

        log::info!("Running EnergyPlus in {:?}", path);
        let started = Instant::now();

        self.claim.begin_run();
        // SAFETY: `run` was resolved from a SymbolSource and `c_path` is a
        // valid NUL-terminated string that outlives the call.
        let status = unsafe { (self.api.run)(c_path.as_ptr()) };
        let outcome = self.claim.finish_run();

        log::info!(
            "EnergyPlus finished with status {} in {:.2?} ({} callbacks fired)",
            status,
            started.elapsed(),
            outcome.stats.total()
        );
        self.last_run = outcome.stats;

        if let Some(fault) = outcome.fault {
            return Err(RuntimeError::CallbackPanicked {
                hook: fault.hook,
                message: fault.message,
                status,
            });
        }

        Ok(status)
    }

    /// Run a simulation in `path`, treating a nonzero status as an error
    pub fn run(&mut self, path: impl AsRef<Path>) -> Result<()> {
        match self.run_energyplus(path)? {
            0 => Ok(()),
            status => Err(RuntimeError::RunFailed { status }),
        }
    }

    /// Register `handler` to run whenever the engine fires `hook`
    ///
    /// A later registration for the same hook replaces this one. The handler
    /// is owned by the adapter until it is replaced, unregistered, or the
    /// adapter is dropped.
    ///
    /// The library appends every registration it receives, so the hook's
    /// trampoline is handed to it only once per process; later registrations
    /// just swap the handler behind it.
    pub fn register_callback<F>(&mut self, hook: CallbackHook, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let previous = self.claim.set_handler(hook, Arc::new(handler));
        if previous.is_some() {
            log::debug!("Replacing existing {} callback", hook);
        } else {
            log::debug!("Registering {} callback", hook);
        }

        let register = self.api.register_fn(hook);
        if !self.claim.mark_native_registration(hook, register as usize) {
            log::trace!("{} trampoline already held by the library", hook);
            return;
        }

        // SAFETY: `register` was resolved from a SymbolSource and the
        // trampoline is a static function valid for the whole process.
        let handle = unsafe { register(Some(dispatch::trampoline_for(hook))) };
        log::trace!("{} returned {:p}", hook.registration_symbol(), handle);
    }

    /// Register a handler for the start of each new environment
    pub fn register_callback_new_environment<F>(&mut self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register_callback(CallbackHook::BeginNewEnvironment, handler);
    }

    /// Register a handler for the start of each zone timestep
    ///
    /// Fires before heat balance initialization, not at every timestep-like
    /// point in the engine.
    pub fn register_callback_new_timestep<F>(&mut self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register_callback(CallbackHook::BeginZoneTimestepBeforeInitHeatBalance, handler);
    }

    /// Drop the handler registered for `hook`
    ///
    /// The library keeps the trampoline; later firings of the hook do
    /// nothing. Returns whether a handler was registered.
    pub fn unregister_callback(&mut self, hook: CallbackHook) -> bool {
        let removed = self.claim.clear_handler(hook).is_some();
        if removed {
            log::debug!("Unregistered {} callback", hook);
        }
        removed
    }

    /// Whether a handler is registered for `hook`
    pub fn has_callback(&self, hook: CallbackHook) -> bool {
        self.claim.has_handler(hook)
    }

    /// Callback firing counts from the most recent run
    pub fn last_run_stats(&self) -> &CallbackStats {
        &self.last_run
    }

    /// Options this adapter was created with
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };

    #[cfg(not(unix))]
    let bytes = path
        .to_str()
        .ok_or_else(|| RuntimeError::InvalidPath(path.to_path_buf()))?
        .as_bytes()
        .to_vec();

    CString::new(bytes).map_err(|_| RuntimeError::InvalidPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_to_cstring() {
        let c_path = path_to_cstring(Path::new("/tmp/run dir")).unwrap();
        assert_eq!(c_path.as_bytes(), b"/tmp/run dir");
    }

    #[test]
    fn test_interior_nul_rejected() {
        let result = path_to_cstring(Path::new("/tmp/bad\0dir"));
        assert!(matches!(result, Err(RuntimeError::InvalidPath(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_passed_through() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/caf\xe9"));
        let c_path = path_to_cstring(path).unwrap();
        assert_eq!(c_path.as_bytes(), b"/tmp/caf\xe9");
    }
}
