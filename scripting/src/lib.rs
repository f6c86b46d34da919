#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Script hook contracts and fault-isolated dispatch.
//!
//! Definitions reference user scripts that export optional callbacks for named
//! simulation events. The [`ScriptHost`] capability resolves those callbacks
//! into a [`HookSet`]; the [`HookDispatcher`] invokes them so that a faulting
//! script can never unwind into the tick loop or leave half-applied commands
//! behind.

mod dispatch;
mod hooks;
mod host;

use std::path::PathBuf;

use thiserror::Error;

pub use dispatch::HookDispatcher;
pub use hooks::{Callback, HookCall, HookName, HookSet, HookValue};
pub use host::{LoadedScript, NativeScript, NativeScriptHost, ScriptContextId, ScriptHost};

/// Failures raised while loading or running user scripts.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The referenced script is unknown to the script host.
    #[error("script `{}` does not exist", path.display())]
    Missing {
        /// Path the definition referenced.
        path: PathBuf,
    },
    /// The script exists but could not be loaded.
    #[error("script `{}` failed to load: {reason}", path.display())]
    Load {
        /// Path the definition referenced.
        path: PathBuf,
        /// Loader diagnostic.
        reason: String,
    },
    /// The callback reported an error while running.
    #[error("script raised an error: {message}")]
    Fault {
        /// Diagnostic reported by the callback.
        message: String,
    },
    /// The callback panicked while running.
    #[error("script panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl ScriptError {
    /// Convenience constructor used by callbacks to report a runtime fault.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }
}
