//! Core types for the EnergyPlus runtime bindings
//!
//! This module defines the lifecycle hooks the simulation engine exposes,
//! the error type returned at the adapter boundary, and per-run callback
//! statistics.

use std::fmt;
use std::path::PathBuf;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Number of lifecycle hooks exposed by the runtime API
pub const HOOK_COUNT: usize = 16;

/// Errors that can occur while binding to or driving the native runtime
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Symbol not found in EnergyPlus library: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("Another EnergyPlus runtime adapter is already active in this process")]
    AdapterActive,

    #[error("Path cannot be passed to EnergyPlus: {0:?}")]
    InvalidPath(PathBuf),

    #[error("EnergyPlus run failed with status {status}")]
    RunFailed { status: i32 },

    #[error("Callback for {hook} panicked: {message} (run status {status})")]
    CallbackPanicked {
        hook: CallbackHook,
        message: String,
        status: i32,
    },
}

/// A lifecycle point at which the simulation engine fires a callback
///
/// Every hook shares the same native signature: no arguments, no return value.
/// The discriminant doubles as the hook's slot in the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackHook {
    /// Start of every new simulation environment (design day or run period)
    BeginNewEnvironment,
    /// After zone sizing calculations
    ZoneSizing,
    /// After system sizing calculations
    SystemSizing,
    /// Start of a zone timestep, before the predictor step
    BeginTimestepBeforePredictor,
    /// End of a system timestep, before HVAC reporting
    EndSystemTimestepBeforeHvacReporting,
    /// End of a system timestep, after HVAC reporting
    EndSystemTimestepAfterHvacReporting,
    /// Before the HVAC managers are simulated
    BeforeHvacManagers,
    /// After the HVAC managers are simulated
    AfterHvacManagers,
    /// Inside the HVAC iteration loop
    HvacIterationLoop,
    /// Start of a zone timestep, before heat balance initialization
    BeginZoneTimestepBeforeInitHeatBalance,
    /// Start of a zone timestep, after heat balance initialization
    BeginZoneTimestepAfterInitHeatBalance,
    /// End of a zone timestep, before zone reporting
    EndZoneTimestepBeforeZoneReporting,
    /// End of a zone timestep, after zone reporting
    EndZoneTimestepAfterZoneReporting,
    /// Start of a new environment, once warm-up has converged
    BeginNewEnvironmentAfterWarmUp,
    /// During unitary system sizing
    UnitarySizing,
    /// External interface exchange point
    ExternalInterface,
}

impl CallbackHook {
    /// All hooks, ordered by slot index
    pub const ALL: [CallbackHook; HOOK_COUNT] = [
        CallbackHook::BeginNewEnvironment,
        CallbackHook::ZoneSizing,
        CallbackHook::SystemSizing,
        CallbackHook::BeginTimestepBeforePredictor,
        CallbackHook::EndSystemTimestepBeforeHvacReporting,
        CallbackHook::EndSystemTimestepAfterHvacReporting,
        CallbackHook::BeforeHvacManagers,
        CallbackHook::AfterHvacManagers,
        CallbackHook::HvacIterationLoop,
        CallbackHook::BeginZoneTimestepBeforeInitHeatBalance,
        CallbackHook::BeginZoneTimestepAfterInitHeatBalance,
        CallbackHook::EndZoneTimestepBeforeZoneReporting,
        CallbackHook::EndZoneTimestepAfterZoneReporting,
        CallbackHook::BeginNewEnvironmentAfterWarmUp,
        CallbackHook::UnitarySizing,
        CallbackHook::ExternalInterface,
    ];

    /// Slot index of this hook in the dispatch table
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a hook by slot index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name of the exported registration function for this hook
    ///
    /// These match the library's export table exactly, including the
    /// engine's own spelling of `BeginNewEvironment`.
    pub fn registration_symbol(self) -> &'static str {
        match self {
            CallbackHook::BeginNewEnvironment => "registerRuntimeCallbackFromBeginNewEvironment",
            CallbackHook::ZoneSizing => "registerRuntimeCallbackFromZoneSizing",
            CallbackHook::SystemSizing => "registerRuntimeCallbackFromSystemSizing",
            CallbackHook::BeginTimestepBeforePredictor => {
                "registerRuntimeCallbackFromBeginTimestepBeforePredictor"
            }
            CallbackHook::EndSystemTimestepBeforeHvacReporting => {
                "registerRuntimeCallbackFromEndSystemTimestepBeforeHVACReporting"
            }
            CallbackHook::EndSystemTimestepAfterHvacReporting => {
                "registerRuntimeCallbackFromEndSystemTimestepAfterHVACReporting"
            }
            CallbackHook::BeforeHvacManagers => "registerRuntimeCallbackFromBeforeHVACManagers",
            CallbackHook::AfterHvacManagers => "registerRuntimeCallbackFromAfterHVACManagers",
            CallbackHook::HvacIterationLoop => "registerRuntimeCallbackFromHVACIterationLoop",
            CallbackHook::BeginZoneTimestepBeforeInitHeatBalance => {
                "registerRuntimeCallbackFromBeginZoneTimestepBeforeInitHeatBalance"
            }
            CallbackHook::BeginZoneTimestepAfterInitHeatBalance => {
                "registerRuntimeCallbackFromBeginZoneTimestepAfterInitHeatBalance"
            }
            CallbackHook::EndZoneTimestepBeforeZoneReporting => {
                "registerRuntimeCallbackFromEndZoneTimestepBeforeZoneReporting"
            }
            CallbackHook::EndZoneTimestepAfterZoneReporting => {
                "registerRuntimeCallbackFromEndZoneTimestepAfterZoneReporting"
            }
            CallbackHook::BeginNewEnvironmentAfterWarmUp => {
                "registerRuntimeCallbackFromBeginNewEnvironmentAfterWarmUp"
            }
            CallbackHook::UnitarySizing => "registerRuntimeCallbackFromUnitarySizing",
            CallbackHook::ExternalInterface => "registerRuntimeCallbackFromExternalInterface",
        }
    }
}

impl fmt::Display for CallbackHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How many times each hook fired during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackStats {
    counts: [u64; HOOK_COUNT],
}

impl CallbackStats {
    pub(crate) fn from_counts(counts: [u64; HOOK_COUNT]) -> Self {
        Self { counts }
    }

    /// Number of times the native library fired `hook`
    ///
    /// Counts every firing, including those with no handler attached.
    pub fn invocations(&self, hook: CallbackHook) -> u64 {
        self.counts[hook.index()]
    }

    /// Total firings across all hooks
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Hooks that fired at least once, with their counts
    pub fn fired(&self) -> impl Iterator<Item = (CallbackHook, u64)> + '_ {
        CallbackHook::ALL
            .iter()
            .map(|hook| (*hook, self.counts[hook.index()]))
            .filter(|(_, count)| *count > 0)
    }
}
