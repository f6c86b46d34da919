//! Script host capability and the in-process native backend.

use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use horde_core::Command;

use crate::{Callback, HookCall, HookName, HookSet, HookValue, ScriptError};

/// Identifier of an isolated script execution context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptContextId(u64);

impl ScriptContextId {
    /// Creates a new context identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Result of loading a script: its context and the callbacks it exports.
#[derive(Clone, Debug)]
pub struct LoadedScript {
    /// Context that must be torn down when the owning definition is disposed.
    pub context: ScriptContextId,
    /// Callbacks resolved from the script's exports.
    pub hooks: HookSet,
}

/// Capability that executes user scripts on behalf of definitions.
///
/// Every successful [`ScriptHost::load`] creates a context owned by the
/// caller, which must hand it back through [`ScriptHost::teardown`].
pub trait ScriptHost {
    /// Reports whether a script exists at the provided path.
    fn exists(&self, path: &Path) -> bool;

    /// Loads the script at `path` into a fresh context and resolves its hooks.
    ///
    /// Missing exports are simply absent from the returned hook set.
    fn load(&mut self, path: &Path) -> Result<LoadedScript, ScriptError>;

    /// Releases a context created by [`ScriptHost::load`].
    fn teardown(&mut self, context: ScriptContextId);
}

/// Script implemented as Rust closures, registered under a virtual path.
#[derive(Clone, Debug, Default)]
pub struct NativeScript {
    hooks: HookSet,
    broken: Option<String>,
}

impl NativeScript {
    /// Creates a script that exports no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports a callback under the provided hook name.
    #[must_use]
    pub fn with_hook<F>(mut self, hook: HookName, callback: F) -> Self
    where
        F: Fn(&HookCall<'_>, &mut Vec<Command>) -> Result<HookValue, ScriptError>
            + Send
            + Sync
            + 'static,
    {
        let callback: Callback = std::sync::Arc::new(callback);
        self.hooks.insert(hook, callback);
        self
    }

    /// Creates a script whose loading always fails with the provided reason.
    #[must_use]
    pub fn broken(reason: impl Into<String>) -> Self {
        Self {
            hooks: HookSet::new(),
            broken: Some(reason.into()),
        }
    }
}

/// [`ScriptHost`] backed by scripts registered in-process.
#[derive(Debug, Default)]
pub struct NativeScriptHost {
    scripts: HashMap<PathBuf, NativeScript>,
    live: BTreeSet<ScriptContextId>,
    next_context: u64,
}

impl NativeScriptHost {
    /// Creates a host with no registered scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a script under the provided path, replacing any previous one.
    pub fn register(&mut self, path: impl Into<PathBuf>, script: NativeScript) {
        let _ = self.scripts.insert(path.into(), script);
    }

    /// Number of contexts loaded and not yet torn down.
    #[must_use]
    pub fn live_contexts(&self) -> usize {
        self.live.len()
    }

    /// Reports whether the context is still alive.
    #[must_use]
    pub fn is_live(&self, context: ScriptContextId) -> bool {
        self.live.contains(&context)
    }
}

impl ScriptHost for NativeScriptHost {
    fn exists(&self, path: &Path) -> bool {
        self.scripts.contains_key(path)
    }

    fn load(&mut self, path: &Path) -> Result<LoadedScript, ScriptError> {
        let script = self.scripts.get(path).ok_or_else(|| ScriptError::Missing {
            path: path.to_path_buf(),
        })?;
        if let Some(reason) = &script.broken {
            return Err(ScriptError::Load {
                path: path.to_path_buf(),
                reason: reason.clone(),
            });
        }

        let hooks = script.hooks.clone();
        self.next_context = self.next_context.saturating_add(1);
        let context = ScriptContextId::new(self.next_context);
        let _ = self.live.insert(context);
        tracing::debug!(path = %path.display(), context = context.get(), "script context loaded");
        Ok(LoadedScript { context, hooks })
    }

    fn teardown(&mut self, context: ScriptContextId) {
        if self.live.remove(&context) {
            tracing::debug!(context = context.get(), "script context torn down");
        }
    }
}
