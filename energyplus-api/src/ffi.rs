//! FFI declarations for the EnergyPlus runtime C API
//!
//! The library exports one run function and one registration function per
//! lifecycle hook. Their signatures are fixed here; symbol addresses come
//! from a [`SymbolSource`], normally a loaded [`libloading::Library`].

use crate::types::{CallbackHook, Result, RuntimeError};
use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;

/// Exported name of the run entry point
pub const RUN_SYMBOL: &str = "cRunEnergyPlus";

/// Native callback shape shared by every lifecycle hook
pub type CallbackFn = extern "C" fn();

/// `int cRunEnergyPlus(const char *path)`
pub type RunFn = unsafe extern "C" fn(path: *const c_char) -> c_int;

/// `void *registerRuntimeCallbackFrom<Hook>(void (*f)())`
///
/// The returned pointer is opaque and never inspected.
pub type RegisterFn = unsafe extern "C" fn(callback: Option<CallbackFn>) -> *mut c_void;

/// Somewhere native entry points can be looked up by name
///
/// # Safety
///
/// Implementors must only return addresses of functions whose signatures
/// match the declarations in this module ([`RunFn`] for [`RUN_SYMBOL`],
/// [`RegisterFn`] for every registration symbol), and those addresses must
/// stay valid for as long as `self` is borrowed.
pub unsafe trait SymbolSource {
    /// Address of the exported symbol `name`, or `None` if it is absent
    fn lookup(&self, name: &str) -> Option<NonNull<c_void>>;
}

unsafe impl SymbolSource for libloading::Library {
    fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
        match unsafe { self.get::<*mut c_void>(name.as_bytes()) } {
            Ok(symbol) => NonNull::new(*symbol),
            Err(e) => {
                log::debug!("Symbol lookup failed for {}: {}", name, e);
                None
            }
        }
    }
}

/// Entry points resolved from a symbol source
pub(crate) struct NativeApi {
    pub(crate) run: RunFn,
    register: Vec<RegisterFn>,
}

impl NativeApi {
    /// Resolve the run entry point and every registration entry point
    ///
    /// Fails on the first missing symbol, in table order.
    pub(crate) fn resolve<L: SymbolSource + ?Sized>(library: &L) -> Result<Self> {
        let run_addr = require(library, RUN_SYMBOL)?;
        // SAFETY: SymbolSource guarantees the address has the RunFn signature.
        let run = unsafe { std::mem::transmute::<*mut c_void, RunFn>(run_addr.as_ptr()) };

        let mut register = Vec::with_capacity(CallbackHook::ALL.len());
        for hook in CallbackHook::ALL {
            let addr = require(library, hook.registration_symbol())?;
            // SAFETY: as above, for RegisterFn.
            register.push(unsafe { std::mem::transmute::<*mut c_void, RegisterFn>(addr.as_ptr()) });
        }

        log::debug!("Resolved {} EnergyPlus entry points", register.len() + 1);
        Ok(Self { run, register })
    }

    pub(crate) fn register_fn(&self, hook: CallbackHook) -> RegisterFn {
        self.register[hook.index()]
    }
}

fn require<L: SymbolSource + ?Sized>(library: &L, name: &str) -> Result<NonNull<c_void>> {
    library.lookup(name).ok_or_else(|| RuntimeError::SymbolNotFound {
        symbol: name.to_string(),
    })
}
