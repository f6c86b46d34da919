//! Administrator chat commands.

use horde_core::PlayerSlot;
use horde_system_spawning::MAX_SPAWN_CAP;
use thiserror::Error;

/// Largest number of entities a single spawn command may create.
pub const MAX_SPAWN_AMOUNT: u32 = 200;

/// Whoever typed a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issuer {
    /// Name shown in announcements.
    pub name: String,
    /// Player slot of the issuer, or `None` for the server console.
    pub player: Option<PlayerSlot>,
}

impl Issuer {
    /// Issuer typing into the server console.
    #[must_use]
    pub fn console() -> Self {
        Self {
            name: "Server".to_owned(),
            player: None,
        }
    }

    /// Issuer connected as the provided player.
    #[must_use]
    pub fn player(name: impl Into<String>, slot: PlayerSlot) -> Self {
        Self {
            name: name.into(),
            player: Some(slot),
        }
    }
}

/// Parsed and range-checked administrator command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    /// Starts the named campaign.
    Invade {
        /// Campaign name as typed.
        name: String,
    },
    /// Stops the running campaign.
    StopInvasion,
    /// Replaces the natural spawn cap.
    MaxSpawns(u32),
    /// Replaces the natural spawn rate.
    SpawnRate(u32),
    /// Spawns custom entities around the issuer.
    SpawnMob {
        /// Definition name as typed.
        name: String,
        /// Number of entities to create.
        amount: u32,
    },
    /// Reloads the configuration and every definition.
    Reload,
}

/// Input problems reported back to the issuer; none of them change state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandInputError {
    /// The command word is not one of ours.
    #[error("Invalid command '{command}'.")]
    Unknown {
        /// Command word as typed.
        command: String,
    },
    /// Wrong number of arguments.
    #[error("Syntax: /{usage}")]
    Syntax {
        /// Usage line without the leading slash.
        usage: &'static str,
    },
    /// Stop was requested while no campaign runs.
    #[error("There is currently no custom invasion.")]
    NoCampaign,
    /// Start was requested while a campaign runs.
    #[error("There is currently already a custom invasion.")]
    CampaignActive,
    /// No campaign carries the name.
    #[error("Invalid invasion '{name}'.")]
    UnknownCampaign {
        /// Campaign name as typed.
        name: String,
    },
    /// Spawn cap is not a number in `0..=200`.
    #[error("Invalid maximum spawns '{input}'.")]
    MaxSpawns {
        /// Argument as typed.
        input: String,
    },
    /// Spawn rate is not a positive number.
    #[error("Invalid spawn rate '{input}'.")]
    SpawnRate {
        /// Argument as typed.
        input: String,
    },
    /// No entity definition carries the name.
    #[error("Invalid custom NPC name '{name}'.")]
    UnknownEntity {
        /// Definition name as typed.
        name: String,
    },
    /// Spawn amount is not a number in `1..=200`.
    #[error("Invalid amount '{input}'.")]
    Amount {
        /// Argument as typed.
        input: String,
    },
    /// The command needs a position in the world.
    #[error("You must use this command in-game.")]
    InGameOnly,
    /// Definitions could not be read.
    #[error("Reload failed: {reason}")]
    ReloadFailed {
        /// Source diagnostic.
        reason: String,
    },
}

/// Spawn command as parsed, before the definition name is resolved.
///
/// The name is checked against the registry before the amount is, so the
/// amount travels unparsed until then.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SpawnRequest {
    pub(crate) name: String,
    pub(crate) amount: Option<String>,
}

impl SpawnRequest {
    pub(crate) fn into_command(self) -> Result<AdminCommand, CommandInputError> {
        let amount = match self.amount {
            None => 1,
            Some(input) => match input.parse::<u32>() {
                Ok(amount) if (1..=MAX_SPAWN_AMOUNT).contains(&amount) => amount,
                _ => return Err(CommandInputError::Amount { input }),
            },
        };
        Ok(AdminCommand::SpawnMob {
            name: self.name,
            amount,
        })
    }
}

/// Outcome of parsing a command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Parsed {
    Ready(AdminCommand),
    Spawn(SpawnRequest),
}

impl AdminCommand {
    /// Parses a command line such as `/cinvade "Goblin Army"`.
    ///
    /// Arguments are separated by whitespace; double quotes group words. The
    /// leading slash is optional. Spawn amounts are range checked here, so a
    /// `cspawnmob` with an unknown name and a bad amount reports the amount.
    /// [`crate::Engine::run_command`] reports the name instead.
    pub fn parse(line: &str) -> Result<Self, CommandInputError> {
        match parse_line(line)? {
            Parsed::Ready(command) => Ok(command),
            Parsed::Spawn(request) => request.into_command(),
        }
    }
}

pub(crate) fn parse_line(line: &str) -> Result<Parsed, CommandInputError> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut words = tokenize(line);
    if words.is_empty() {
        return Err(CommandInputError::Unknown {
            command: String::new(),
        });
    }
    let command = words.remove(0);
    let arguments = words;

    match command.to_ascii_lowercase().as_str() {
        "cinvade" => {
            let [name] = exactly::<1>(arguments, "cinvade <name|stop>")?;
            if name.eq_ignore_ascii_case("stop") {
                Ok(Parsed::Ready(AdminCommand::StopInvasion))
            } else {
                Ok(Parsed::Ready(AdminCommand::Invade { name }))
            }
        }
        "cmaxspawns" => {
            let [input] = exactly::<1>(arguments, "cmaxspawns <max-spawns>")?;
            match input.parse::<u32>() {
                Ok(max) if max <= MAX_SPAWN_CAP => Ok(Parsed::Ready(AdminCommand::MaxSpawns(max))),
                _ => Err(CommandInputError::MaxSpawns { input }),
            }
        }
        "cspawnrate" => {
            let [input] = exactly::<1>(arguments, "cspawnrate <spawn-rate>")?;
            match input.parse::<u32>() {
                Ok(rate) if rate >= 1 => Ok(Parsed::Ready(AdminCommand::SpawnRate(rate))),
                _ => Err(CommandInputError::SpawnRate { input }),
            }
        }
        "cspawnmob" | "csm" => {
            let mut arguments = arguments.into_iter();
            match (arguments.next(), arguments.next(), arguments.next()) {
                (Some(name), amount, None) => Ok(Parsed::Spawn(SpawnRequest { name, amount })),
                _ => Err(CommandInputError::Syntax {
                    usage: "cspawnmob <name> [amount]",
                }),
            }
        }
        "creload" => {
            let [] = exactly::<0>(arguments, "creload")?;
            Ok(Parsed::Ready(AdminCommand::Reload))
        }
        _ => Err(CommandInputError::Unknown { command }),
    }
}

fn exactly<const N: usize>(
    arguments: Vec<String>,
    usage: &'static str,
) -> Result<[String; N], CommandInputError> {
    arguments
        .try_into()
        .map_err(|_| CommandInputError::Syntax { usage })
}

/// Splits on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for character in line.chars() {
        match character {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_words_stay_together() {
        assert_eq!(
            tokenize(r#"cinvade "Goblin Army"  now"#),
            vec!["cinvade", "Goblin Army", "now"]
        );
        assert_eq!(tokenize(r#"csm """#), vec!["csm", ""]);
    }

    #[test]
    fn commands_parse_with_or_without_a_slash() {
        assert_eq!(
            AdminCommand::parse("/cinvade \"Goblin Army\""),
            Ok(AdminCommand::Invade {
                name: "Goblin Army".to_owned()
            })
        );
        assert_eq!(AdminCommand::parse("cinvade STOP"), Ok(AdminCommand::StopInvasion));
        assert_eq!(AdminCommand::parse("/CMAXSPAWNS 200"), Ok(AdminCommand::MaxSpawns(200)));
        assert_eq!(AdminCommand::parse("/cspawnrate 1"), Ok(AdminCommand::SpawnRate(1)));
        assert_eq!(
            AdminCommand::parse("/csm Bat"),
            Ok(AdminCommand::SpawnMob {
                name: "Bat".to_owned(),
                amount: 1
            })
        );
        assert_eq!(AdminCommand::parse("/creload"), Ok(AdminCommand::Reload));
    }

    #[test]
    fn out_of_range_arguments_are_rejected() {
        assert_eq!(
            AdminCommand::parse("/cmaxspawns 201"),
            Err(CommandInputError::MaxSpawns {
                input: "201".to_owned()
            })
        );
        assert_eq!(
            AdminCommand::parse("/cspawnrate 0"),
            Err(CommandInputError::SpawnRate {
                input: "0".to_owned()
            })
        );
        assert_eq!(
            AdminCommand::parse("/cspawnmob Bat 0"),
            Err(CommandInputError::Amount {
                input: "0".to_owned()
            })
        );
        assert_eq!(
            AdminCommand::parse("/cinvade a b").map_err(|error| error.to_string()),
            Err("Syntax: /cinvade <name|stop>".to_owned())
        );
        assert!(matches!(
            AdminCommand::parse("/ctransmute"),
            Err(CommandInputError::Unknown { .. })
        ));
    }
}
