//! Process-wide callback dispatch
//!
//! Native hooks receive a bare `void (*)()` with no context pointer, so each
//! hook gets its own static trampoline that looks its handler up in a global
//! table by slot index. The table is claimed by exactly one live adapter at a
//! time and owns every registered handler until that adapter lets go.

use crate::config::{CallbackPanicPolicy, RuntimeOptions};
use crate::ffi::CallbackFn;
use crate::types::{CallbackHook, CallbackStats, Result, RuntimeError, HOOK_COUNT};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// A caller-supplied handler as held by the dispatch table
pub(crate) type Handler = Arc<dyn Fn() + Send + Sync + 'static>;

/// First handler panic observed during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fault {
    pub(crate) hook: CallbackHook,
    pub(crate) message: String,
}

/// What a run left behind in the table
pub(crate) struct RunOutcome {
    pub(crate) stats: CallbackStats,
    pub(crate) fault: Option<Fault>,
}

const NO_HANDLER: Option<Handler> = None;

struct DispatchTable {
    owner: Option<u64>,
    handlers: [Option<Handler>; HOOK_COUNT],
    counts: [u64; HOOK_COUNT],
    fault: Option<Fault>,
    panic_policy: CallbackPanicPolicy,
    warn_on_foreign_thread: bool,
    run_thread: Option<ThreadId>,
    foreign_thread_warned: bool,
    // (slot, registration function address) pairs the library already holds
    // a trampoline for. Never cleared: the library keeps what it was given.
    native_registrations: Vec<(usize, usize)>,
}

impl DispatchTable {
    const fn new() -> Self {
        Self {
            owner: None,
            handlers: [NO_HANDLER; HOOK_COUNT],
            counts: [0; HOOK_COUNT],
            fault: None,
            panic_policy: CallbackPanicPolicy::SkipRemaining,
            warn_on_foreign_thread: true,
            run_thread: None,
            foreign_thread_warned: false,
            native_registrations: Vec::new(),
        }
    }

    fn reset_run_state(&mut self) {
        self.counts = [0; HOOK_COUNT];
        self.fault = None;
        self.run_thread = None;
        self.foreign_thread_warned = false;
    }
}

static TABLE: Mutex<DispatchTable> = Mutex::new(DispatchTable::new());
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

// Trampolines must never unwind into native code, so a poisoned lock is
// recovered rather than surfaced.
fn lock_table() -> MutexGuard<'static, DispatchTable> {
    TABLE.lock().unwrap_or_else(PoisonError::into_inner)
}

const TRAMPOLINES: [CallbackFn; HOOK_COUNT] = [
    trampoline::<0>,
    trampoline::<1>,
    trampoline::<2>,
    trampoline::<3>,
    trampoline::<4>,
    trampoline::<5>,
    trampoline::<6>,
    trampoline::<7>,
    trampoline::<8>,
    trampoline::<9>,
    trampoline::<10>,
    trampoline::<11>,
    trampoline::<12>,
    trampoline::<13>,
    trampoline::<14>,
    trampoline::<15>,
];

/// The static function handed to the native library for `hook`
pub(crate) fn trampoline_for(hook: CallbackHook) -> CallbackFn {
    TRAMPOLINES[hook.index()]
}

extern "C" fn trampoline<const SLOT: usize>() {
    dispatch(SLOT);
}

fn dispatch(slot: usize) {
    let Some(hook) = CallbackHook::from_index(slot) else {
        return;
    };

    let handler = {
        let mut table = lock_table();
        table.counts[slot] += 1;

        if let Some(run_thread) = table.run_thread {
            if table.warn_on_foreign_thread
                && !table.foreign_thread_warned
                && run_thread != thread::current().id()
            {
                table.foreign_thread_warned = true;
                log::warn!(
                    "{} fired on {:?}, not the thread running the simulation",
                    hook,
                    thread::current().id()
                );
            }
        }

        if table.fault.is_some() && table.panic_policy == CallbackPanicPolicy::SkipRemaining {
            log::trace!("Skipping {} callback after earlier panic", hook);
            return;
        }

        match &table.handlers[slot] {
            Some(handler) => Arc::clone(handler),
            None => {
                log::trace!("{} fired with no handler registered", hook);
                return;
            }
        }
    };

    log::trace!("Invoking {} callback", hook);
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (*handler)())) {
        let message = panic_message(payload.as_ref());
        log::error!("Callback for {} panicked: {}", hook, message);

        let mut table = lock_table();
        if table.fault.is_none() {
            table.fault = Some(Fault { hook, message });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// Exclusive ownership of the dispatch table
///
/// Dropping the claim releases every handler it registered.
#[derive(Debug)]
pub(crate) struct DispatchClaim {
    token: u64,
}

/// Take ownership of the dispatch table for a new adapter
pub(crate) fn claim(options: &RuntimeOptions) -> Result<DispatchClaim> {
    let mut table = lock_table();
    if table.owner.is_some() {
        return Err(RuntimeError::AdapterActive);
    }

    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    table.owner = Some(token);
    table.panic_policy = options.callback_panic_policy;
    table.warn_on_foreign_thread = options.warn_on_foreign_thread;
    table.reset_run_state();
    log::debug!("Dispatch table claimed (token {})", token);

    Ok(DispatchClaim { token })
}

impl DispatchClaim {
    fn with_table<R>(&self, f: impl FnOnce(&mut DispatchTable) -> R) -> Option<R> {
        let mut table = lock_table();
        if table.owner != Some(self.token) {
            return None;
        }
        Some(f(&mut table))
    }

    /// Install `handler` for `hook`, returning the handler it replaced
    pub(crate) fn set_handler(&self, hook: CallbackHook, handler: Handler) -> Option<Handler> {
        self.with_table(|table| table.handlers[hook.index()].replace(handler))
            .flatten()
    }

    /// Remove the handler for `hook`, returning it
    pub(crate) fn clear_handler(&self, hook: CallbackHook) -> Option<Handler> {
        self.with_table(|table| table.handlers[hook.index()].take())
            .flatten()
    }

    /// Note that `hook`'s trampoline is being handed to the registration
    /// function at `register_addr`
    ///
    /// Returns `false` if that function already received it, in this claim
    /// or an earlier one, and must not be called again.
    pub(crate) fn mark_native_registration(&self, hook: CallbackHook, register_addr: usize) -> bool {
        self.with_table(|table| {
            let key = (hook.index(), register_addr);
            if table.native_registrations.contains(&key) {
                false
            } else {
                table.native_registrations.push(key);
                true
            }
        })
        .unwrap_or(false)
    }

    pub(crate) fn has_handler(&self, hook: CallbackHook) -> bool {
        self.with_table(|table| table.handlers[hook.index()].is_some())
            .unwrap_or(false)
    }

    /// Reset counters and the fault slot, and note the running thread
    pub(crate) fn begin_run(&self) {
        self.with_table(|table| {
            table.reset_run_state();
            table.run_thread = Some(thread::current().id());
        });
    }

    pub(crate) fn finish_run(&self) -> RunOutcome {
        self.with_table(|table| {
            table.run_thread = None;
            RunOutcome {
                stats: CallbackStats::from_counts(table.counts),
                fault: table.fault.take(),
            }
        })
        .unwrap_or_else(|| RunOutcome {
            stats: CallbackStats::default(),
            fault: None,
        })
    }
}

impl Drop for DispatchClaim {
    fn drop(&mut self) {
        // Handlers are dropped after the lock is released.
        let released = self.with_table(|table| {
            table.owner = None;
            table.reset_run_state();
            std::mem::replace(&mut table.handlers, [NO_HANDLER; HOOK_COUNT])
        });

        if let Some(handlers) = released {
            let count = handlers.iter().filter(|h| h.is_some()).count();
            drop(handlers);
            log::debug!(
                "Dispatch table released (token {}, {} handlers dropped)",
                self.token,
                count
            );
        }
    }
}
