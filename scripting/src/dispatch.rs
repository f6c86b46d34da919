//! Fault-isolated invocation of resolved hooks.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use horde_core::Command;

use crate::{HookCall, HookName, HookSet, HookValue, ScriptError};

/// Invokes script callbacks so that faults never escape into the caller.
#[derive(Debug, Default)]
pub struct HookDispatcher {
    scratch: Vec<Command>,
    faults: u64,
}

impl HookDispatcher {
    /// Creates a dispatcher with an empty command buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callback faults isolated so far.
    #[must_use]
    pub const fn faults(&self) -> u64 {
        self.faults
    }

    /// Runs the callback `hooks` resolves for `call`, if any.
    ///
    /// Absent hooks return the hook's default value without side effects. A
    /// callback that errors or panics is logged against `owner` and also yields
    /// the default; commands it queued are discarded. Commands from a
    /// successful callback are appended to `out`.
    pub fn invoke(
        &mut self,
        owner: &str,
        hooks: &HookSet,
        call: &HookCall<'_>,
        out: &mut Vec<Command>,
    ) -> HookValue {
        let hook = call.hook();
        let Some(callback) = hooks.get(hook) else {
            return hook.default_value();
        };

        self.scratch.clear();
        let scratch = &mut self.scratch;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(call, scratch)));

        let error = match outcome {
            Ok(Ok(value)) => {
                out.append(&mut self.scratch);
                return conform(hook, value);
            }
            Ok(Err(error)) => error,
            Err(payload) => ScriptError::Panicked {
                message: panic_message(payload.as_ref()),
            },
        };

        self.scratch.clear();
        self.faults = self.faults.saturating_add(1);
        tracing::warn!(definition = owner, hook = %hook, %error, "script hook faulted");
        hook.default_value()
    }

    /// Runs a boolean hook, treating absent or faulting callbacks as `false`.
    pub fn invoke_flag(
        &mut self,
        owner: &str,
        hooks: &HookSet,
        call: &HookCall<'_>,
        out: &mut Vec<Command>,
    ) -> bool {
        self.invoke(owner, hooks, call, out)
            .as_bool()
            .unwrap_or(false)
    }
}

/// Coerces a returned value into the shape the hook promises.
fn conform(hook: HookName, value: HookValue) -> HookValue {
    match (hook.default_value(), value) {
        (HookValue::Bool(_), HookValue::Bool(flag)) => HookValue::Bool(flag),
        (default, _) => default,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
