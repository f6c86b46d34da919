//! Scripts compiled into the binary, addressed by virtual paths.

use horde_core::{Command, MessageColor};
use horde_scripting::{HookCall, HookName, HookValue, NativeScript, NativeScriptHost};

/// Allows its definition to spawn naturally anywhere.
pub(crate) const ALWAYS_SPAWN: &str = "scripts/always_spawn";
/// Allows its definition to replace every matching host entity.
pub(crate) const REPLACE_ALL: &str = "scripts/replace_all";
/// Announces deaths and campaign ticks in chat.
pub(crate) const HERALD: &str = "scripts/herald";

/// Builds a script host with every built-in script registered.
pub(crate) fn builtin_host() -> NativeScriptHost {
    let mut host = NativeScriptHost::new();
    host.register(
        ALWAYS_SPAWN,
        NativeScript::new().with_hook(HookName::CheckSpawn, |_, _| Ok(HookValue::Bool(true))),
    );
    host.register(
        REPLACE_ALL,
        NativeScript::new().with_hook(HookName::CheckReplace, |_, _| Ok(HookValue::Bool(true))),
    );
    host.register(
        HERALD,
        NativeScript::new()
            .with_hook(HookName::CheckSpawn, |call, _| {
                let HookCall::CheckSpawn { player, .. } = call else {
                    return Ok(HookValue::Bool(false));
                };
                Ok(HookValue::Bool(!player.immune))
            })
            .with_hook(HookName::Killed, |call, out| {
                if let HookCall::Killed { entity } = call {
                    out.push(Command::Broadcast {
                        message: format!("A herald fell at slot {}.", entity.slot.get()),
                        color: MessageColor::INFO,
                    });
                }
                Ok(HookValue::Unit)
            }),
    );
    host
}

