//! Owner of every loaded definition.

use std::{collections::HashSet, fmt};

use horde_scripting::ScriptHost;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    CampaignDefinition, DefinitionSource, EntityDefinition, RawDefinitions, SourceError,
    ValidationError,
};

/// Placeholder reported for entries that do not carry a readable name.
const UNNAMED: &str = "<unnamed>";

/// Kind of definition a rejection refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    /// Custom entity definition.
    Entity,
    /// Campaign definition.
    Campaign,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => f.write_str("entity"),
            Self::Campaign => f.write_str("campaign"),
        }
    }
}

/// Definition that failed to load, with the reason.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    /// Kind of the rejected definition.
    pub kind: DefinitionKind,
    /// Name of the rejected definition, as far as it could be read.
    pub name: String,
    /// Why the definition was rejected.
    pub reason: ValidationError,
}

/// Outcome of a load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    /// Number of entity definitions accepted.
    pub entities: usize,
    /// Number of campaign definitions accepted.
    pub campaigns: usize,
    /// Entries that were rejected, in source order.
    pub rejected: Vec<Rejection>,
}

impl LoadReport {
    /// Number of definitions of either kind that were accepted.
    #[must_use]
    pub const fn valid_count(&self) -> usize {
        self.entities + self.campaigns
    }
}

/// Sole owner of entity and campaign definitions.
///
/// Everything else refers to definitions by name and resolves them here, so
/// a reload can never leave a dangling reference behind.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    entities: Vec<EntityDefinition>,
    campaigns: Vec<CampaignDefinition>,
}

impl DefinitionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registry's contents with the definitions read from
    /// `source`.
    ///
    /// Only an unreadable source fails the load, in which case the current
    /// definitions stay untouched. Otherwise the current definitions are
    /// disposed and each entry is decoded, validated and has its script
    /// loaded independently; rejected entries are listed in the report.
    pub fn load(
        &mut self,
        source: &dyn DefinitionSource,
        scripts: &mut dyn ScriptHost,
    ) -> Result<LoadReport, SourceError> {
        let raw = source.load()?;
        self.dispose(scripts);

        let mut report = LoadReport::default();
        let mut names = HashSet::new();
        for value in raw.entities {
            match accept::<EntityDefinition>(value, &mut names, |definition| {
                definition.validate(&*scripts)?;
                if let Some(path) = definition.script_path().cloned() {
                    definition.attach(scripts.load(&path)?);
                }
                Ok(())
            }) {
                Ok(definition) => self.entities.push(definition),
                Err((name, reason)) => {
                    report.rejected.push(reject(DefinitionKind::Entity, name, reason));
                }
            }
        }

        names.clear();
        for value in raw.campaigns {
            match accept::<CampaignDefinition>(value, &mut names, |campaign| {
                campaign.validate(&*scripts)?;
                if let Some(path) = campaign.script_path().cloned() {
                    campaign.attach(scripts.load(&path)?);
                }
                Ok(())
            }) {
                Ok(campaign) => self.campaigns.push(campaign),
                Err((name, reason)) => {
                    report
                        .rejected
                        .push(reject(DefinitionKind::Campaign, name, reason));
                }
            }
        }

        report.entities = self.entities.len();
        report.campaigns = self.campaigns.len();
        tracing::info!(
            entities = report.entities,
            campaigns = report.campaigns,
            rejected = report.rejected.len(),
            "definitions loaded"
        );
        Ok(report)
    }

    /// Releases every hook and tears down every script context.
    ///
    /// Safe to call repeatedly.
    pub fn dispose(&mut self, scripts: &mut dyn ScriptHost) {
        if self.entities.is_empty() && self.campaigns.is_empty() {
            return;
        }
        for definition in &mut self.entities {
            definition.dispose(scripts);
        }
        for campaign in &mut self.campaigns {
            campaign.dispose(scripts);
        }
        self.entities.clear();
        self.campaigns.clear();
        tracing::debug!("definitions disposed");
    }

    /// Entity definition with the provided name, ignoring case.
    #[must_use]
    pub fn find_entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities
            .iter()
            .find(|definition| definition.name().eq_ignore_ascii_case(name))
    }

    /// Campaign definition with the provided name, ignoring case.
    #[must_use]
    pub fn find_campaign(&self, name: &str) -> Option<&CampaignDefinition> {
        self.campaigns
            .iter()
            .find(|campaign| campaign.name().eq_ignore_ascii_case(name))
    }

    /// Loaded entity definitions in source order.
    #[must_use]
    pub fn entities(&self) -> &[EntityDefinition] {
        &self.entities
    }

    /// Loaded campaign definitions in source order.
    #[must_use]
    pub fn campaigns(&self) -> &[CampaignDefinition] {
        &self.campaigns
    }

    /// Encodes the loaded definitions back into raw entries.
    pub fn snapshot(&self) -> Result<RawDefinitions, SourceError> {
        Ok(RawDefinitions {
            entities: self
                .entities
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
            campaigns: self
                .campaigns
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Named definition that can be checked for duplicates.
trait Named {
    fn definition_name(&self) -> &str;
}

impl Named for EntityDefinition {
    fn definition_name(&self) -> &str {
        self.name()
    }
}

impl Named for CampaignDefinition {
    fn definition_name(&self) -> &str {
        self.name()
    }
}

/// Decodes, deduplicates and prepares a single entry.
fn accept<T>(
    value: Value,
    names: &mut HashSet<String>,
    prepare: impl FnOnce(&mut T) -> Result<(), ValidationError>,
) -> Result<T, (String, ValidationError)>
where
    T: DeserializeOwned + Named,
{
    let fallback_name = value
        .get("Name")
        .and_then(Value::as_str)
        .unwrap_or(UNNAMED)
        .to_owned();
    let mut definition: T = serde_json::from_value(value).map_err(|error| {
        (
            fallback_name,
            ValidationError::Malformed {
                reason: error.to_string(),
            },
        )
    })?;

    let name = definition.definition_name().to_owned();
    let folded = name.to_ascii_lowercase();
    if names.contains(&folded) {
        return Err((name.clone(), ValidationError::DuplicateName { name }));
    }
    prepare(&mut definition).map_err(|reason| (name.clone(), reason))?;
    let _ = names.insert(folded);
    Ok(definition)
}

fn reject(kind: DefinitionKind, name: String, reason: ValidationError) -> Rejection {
    tracing::warn!(%kind, name = %name, %reason, "definition rejected");
    Rejection { kind, name, reason }
}
