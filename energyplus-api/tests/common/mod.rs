//! In-process stand-in for the EnergyPlus shared library
//!
//! Exposes the same 17 entry points as `extern "C"` functions. Like the real
//! engine, registration appends to a per-hook callback list and every entry
//! fires on each event. The stub run records the path it was given, fires a
//! scripted sequence of hooks, and returns a configurable status.

#![allow(dead_code)]

use energyplus_api::{CallbackFn, CallbackHook, SymbolSource, HOOK_COUNT, RUN_SYMBOL};
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

const NO_CALLBACKS: Vec<CallbackFn> = Vec::new();

static REGISTERED: Mutex<[Vec<CallbackFn>; HOOK_COUNT]> = Mutex::new([NO_CALLBACKS; HOOK_COUNT]);
static SCRIPT: Mutex<Vec<CallbackHook>> = Mutex::new(Vec::new());
static LAST_PATH: Mutex<Option<Vec<u8>>> = Mutex::new(None);
static RUN_STATUS: AtomicI32 = AtomicI32::new(0);
static RUN_CALLS: AtomicUsize = AtomicUsize::new(0);
static REGISTRATION_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Symbol table over the stub entry points
pub struct StubLibrary {
    symbols: HashMap<String, NonNull<c_void>>,
}

impl StubLibrary {
    /// All 17 entry points present
    pub fn complete() -> Self {
        let mut symbols = HashMap::new();
        symbols.insert(RUN_SYMBOL.to_string(), address(stub_run as *const ()));
        for hook in CallbackHook::ALL {
            symbols.insert(
                hook.registration_symbol().to_string(),
                address(REGISTER_STUBS[hook.index()] as *const ()),
            );
        }
        Self { symbols }
    }

    /// Every entry point except `symbol`
    pub fn without(symbol: &str) -> Self {
        let mut library = Self::complete();
        library.symbols.remove(symbol);
        library
    }
}

unsafe impl SymbolSource for StubLibrary {
    fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
        self.symbols.get(name).copied()
    }
}

fn address(f: *const ()) -> NonNull<c_void> {
    NonNull::new(f as *mut c_void).unwrap()
}

/// Every exported name the real library must provide
pub fn all_symbols() -> Vec<&'static str> {
    let mut names = vec![RUN_SYMBOL];
    names.extend(CallbackHook::ALL.iter().map(|hook| hook.registration_symbol()));
    names
}

/// Clear script, counters and the recorded path
///
/// Registered callbacks are kept, as a loaded library keeps them for the
/// life of the process.
pub fn reset() {
    SCRIPT.lock().unwrap().clear();
    *LAST_PATH.lock().unwrap() = None;
    RUN_STATUS.store(0, Ordering::SeqCst);
    RUN_CALLS.store(0, Ordering::SeqCst);
    REGISTRATION_CALLS.store(0, Ordering::SeqCst);
}

/// Hooks the next stub run fires, in order
pub fn script(hooks: &[CallbackHook]) {
    *SCRIPT.lock().unwrap() = hooks.to_vec();
}

/// Status code the next stub run returns
pub fn set_status(status: i32) {
    RUN_STATUS.store(status, Ordering::SeqCst);
}

pub fn run_calls() -> usize {
    RUN_CALLS.load(Ordering::SeqCst)
}

pub fn registration_calls() -> usize {
    REGISTRATION_CALLS.load(Ordering::SeqCst)
}

pub fn last_path() -> Option<Vec<u8>> {
    LAST_PATH.lock().unwrap().clone()
}

pub fn is_registered(hook: CallbackHook) -> bool {
    registered_count(hook) > 0
}

/// How many callbacks the stub holds for `hook`
pub fn registered_count(hook: CallbackHook) -> usize {
    REGISTERED.lock().unwrap()[hook.index()].len()
}

/// Fire `hook` the way the engine would: every registered callback, in order
pub fn fire(hook: CallbackHook) {
    let callbacks = REGISTERED.lock().unwrap()[hook.index()].clone();
    for callback in callbacks {
        callback();
    }
}

extern "C" fn stub_run(path: *const c_char) -> c_int {
    RUN_CALLS.fetch_add(1, Ordering::SeqCst);
    if !path.is_null() {
        let bytes = unsafe { CStr::from_ptr(path) }.to_bytes().to_vec();
        *LAST_PATH.lock().unwrap() = Some(bytes);
    }

    let script = SCRIPT.lock().unwrap().clone();
    for hook in script {
        fire(hook);
    }

    RUN_STATUS.load(Ordering::SeqCst)
}

extern "C" fn stub_register<const SLOT: usize>(callback: Option<CallbackFn>) -> *mut c_void {
    REGISTRATION_CALLS.fetch_add(1, Ordering::SeqCst);
    if let Some(callback) = callback {
        REGISTERED.lock().unwrap()[SLOT].push(callback);
    }
    std::ptr::null_mut()
}

type StubRegisterFn = extern "C" fn(Option<CallbackFn>) -> *mut c_void;

const REGISTER_STUBS: [StubRegisterFn; HOOK_COUNT] = [
    stub_register::<0>,
    stub_register::<1>,
    stub_register::<2>,
    stub_register::<3>,
    stub_register::<4>,
    stub_register::<5>,
    stub_register::<6>,
    stub_register::<7>,
    stub_register::<8>,
    stub_register::<9>,
    stub_register::<10>,
    stub_register::<11>,
    stub_register::<12>,
    stub_register::<13>,
    stub_register::<14>,
    stub_register::<15>,
];
