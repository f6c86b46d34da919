use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use horde_core::{EntityKey, EntitySlot, EntitySnapshot, Vec2};
use horde_definitions::{
    DefinitionKind, DefinitionRegistry, DefinitionSource, InMemorySource, JsonDirectorySource,
    RawDefinitions, SourceError, ValidationError,
};
use horde_scripting::{
    HookCall, HookDispatcher, HookName, HookValue, NativeScript, NativeScriptHost,
};
use serde_json::json;

fn goblin_campaign() -> serde_json::Value {
    json!({
        "Name": "Goblin Army",
        "CompletedMessage": "The goblins retreat!",
        "PointValues": { "26": 1, "Goblin Shaman": 5 },
        "ScaleByPlayers": true,
        "AtSpawnOnly": false,
        "Waves": [
            {
                "StartMessage": "Goblins approach...",
                "PointsRequired": 100,
                "Miniboss": "Boss1",
                "MaxSpawns": 10,
                "SpawnRate": 30,
                "Weights": { "26": 5, "Goblin Shaman": 1 }
            }
        ]
    })
}

#[test]
fn out_of_range_base_type_is_rejected_while_siblings_load() {
    let source = InMemorySource::from_values(
        vec![
            json!({ "Name": "Slime King", "BaseType": 1 }),
            json!({ "Name": "Broken", "BaseType": -999 }),
            json!({ "Name": "Goblin Shaman", "BaseType": 26 }),
        ],
        vec![goblin_campaign()],
    );
    let mut scripts = NativeScriptHost::new();
    let mut registry = DefinitionRegistry::new();

    let report = registry.load(&source, &mut scripts).expect("source is readable");

    assert_eq!(report.entities, 2);
    assert_eq!(report.campaigns, 1);
    assert_eq!(report.valid_count(), 3);
    assert_eq!(report.rejected.len(), 1);
    let rejection = &report.rejected[0];
    assert_eq!(rejection.kind, DefinitionKind::Entity);
    assert_eq!(rejection.name, "Broken");
    assert!(matches!(
        rejection.reason,
        ValidationError::BaseTypeOutOfRange {
            base_type: -999,
            ..
        }
    ));
    assert!(registry.find_entity("slime king").is_some());
    assert!(registry.find_entity("Broken").is_none());
}

#[test]
fn malformed_and_duplicate_entries_are_rejected_individually() {
    let source = InMemorySource::from_values(
        vec![
            json!({ "Name": "Bat", "BaseType": "not a number" }),
            json!({ "Name": "Imp", "BaseType": 24 }),
            json!({ "Name": "IMP", "BaseType": 25 }),
            json!(17),
        ],
        Vec::new(),
    );
    let mut scripts = NativeScriptHost::new();
    let mut registry = DefinitionRegistry::new();

    let report = registry.load(&source, &mut scripts).expect("source is readable");

    assert_eq!(report.entities, 1);
    let reasons: Vec<(&str, &ValidationError)> = report
        .rejected
        .iter()
        .map(|rejection| (rejection.name.as_str(), &rejection.reason))
        .collect();
    assert!(matches!(reasons[0], ("Bat", ValidationError::Malformed { .. })));
    assert!(matches!(
        reasons[1],
        ("IMP", ValidationError::DuplicateName { .. })
    ));
    assert!(matches!(
        reasons[2],
        ("<unnamed>", ValidationError::Malformed { .. })
    ));
    assert_eq!(
        registry.find_entity("imp").map(|definition| definition.base_type()),
        Some(24)
    );
}

#[test]
fn campaign_fields_decode_with_insertion_order() {
    let source = InMemorySource::from_values(Vec::new(), vec![goblin_campaign()]);
    let mut scripts = NativeScriptHost::new();
    let mut registry = DefinitionRegistry::new();
    let _ = registry.load(&source, &mut scripts).expect("source is readable");

    let campaign = registry.find_campaign("goblin army").expect("campaign loaded");
    assert!(campaign.scale_by_players());
    assert!(!campaign.is_at_spawn_only());
    assert_eq!(campaign.points_for(&EntityKey::parse("goblin shaman")), Some(5));

    let wave = campaign.wave(0).expect("first wave");
    assert_eq!(wave.miniboss, Some(EntityKey::parse("Boss1")));
    let keys: Vec<String> = wave.weights.iter().map(|(key, _)| key.to_string()).collect();
    assert_eq!(keys, vec!["26", "Goblin Shaman"]);
}

#[test]
fn failing_script_is_a_rejection() {
    let source = InMemorySource::from_values(
        vec![
            json!({ "Name": "Cursed", "BaseType": 3, "ScriptPath": "cursed.lua" }),
            json!({ "Name": "Ghost", "BaseType": 3, "ScriptPath": "ghost.lua" }),
        ],
        Vec::new(),
    );
    let mut scripts = NativeScriptHost::new();
    scripts.register("cursed.lua", NativeScript::broken("unexpected symbol near 'local'"));
    let mut registry = DefinitionRegistry::new();

    let report = registry.load(&source, &mut scripts).expect("source is readable");

    assert_eq!(report.entities, 0);
    assert!(matches!(
        report.rejected[0].reason,
        ValidationError::Script(horde_scripting::ScriptError::Load { .. })
    ));
    assert!(matches!(
        report.rejected[1].reason,
        ValidationError::MissingScript { .. }
    ));
    assert_eq!(scripts.live_contexts(), 0);
}

#[test]
fn reload_disposes_previous_hooks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut scripts = NativeScriptHost::new();
    scripts.register(
        "slime.lua",
        NativeScript::new().with_hook(HookName::Spawn, move |_call, _out| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            Ok(HookValue::Unit)
        }),
    );
    let mut source = InMemorySource::from_values(
        vec![json!({ "Name": "Slime", "BaseType": 1, "ScriptPath": "slime.lua" })],
        Vec::new(),
    );
    let mut registry = DefinitionRegistry::new();
    let _ = registry.load(&source, &mut scripts).expect("source is readable");
    assert_eq!(scripts.live_contexts(), 1);

    let before = registry.find_entity("Slime").expect("loaded").hooks().clone();
    let snapshot = EntitySnapshot {
        slot: EntitySlot::new(0),
        archetype: 1,
        position: Vec2::ZERO,
        size: Vec2::new(16.0, 16.0),
    };
    let mut dispatcher = HookDispatcher::new();
    let mut out = Vec::new();
    let _ = dispatcher.invoke("Slime", &before, &HookCall::Spawn { entity: &snapshot }, &mut out);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    source.replace(RawDefinitions {
        entities: vec![json!({ "Name": "Slime", "BaseType": 2 })],
        campaigns: Vec::new(),
    });
    let report = registry.load(&source, &mut scripts).expect("source is readable");

    assert_eq!(report.entities, 1);
    assert_eq!(scripts.live_contexts(), 0);
    let after = registry.find_entity("slime").expect("reloaded");
    assert_eq!(after.base_type(), 2);
    assert!(after.hooks().is_empty());

    registry.dispose(&mut scripts);
    registry.dispose(&mut scripts);
    assert!(registry.entities().is_empty());
}

#[test]
fn unreadable_source_keeps_current_definitions() {
    struct Unreadable;

    impl DefinitionSource for Unreadable {
        fn load(&self) -> Result<RawDefinitions, SourceError> {
            Err(SourceError::Io {
                path: Path::new("npcs.json").to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    let mut scripts = NativeScriptHost::new();
    let mut registry = DefinitionRegistry::new();
    let _ = registry
        .load(
            &InMemorySource::from_values(vec![json!({ "Name": "Imp", "BaseType": 24 })], Vec::new()),
            &mut scripts,
        )
        .expect("source is readable");

    assert!(registry.load(&Unreadable, &mut scripts).is_err());
    assert!(registry.find_entity("Imp").is_some());
}

#[test]
fn definitions_round_trip_through_a_directory() {
    let directory = std::env::temp_dir().join(format!("horde-definitions-{}", std::process::id()));
    let source = JsonDirectorySource::new(&directory);
    let original = RawDefinitions {
        entities: vec![json!({
            "Name": "Armored Slime",
            "BaseType": 1,
            "BaseOverride": { "Defense": 12, "BuffImmunities": [20, 24], "Name": "Armored Slime" },
            "Loot": {
                "TallyKills": true,
                "IsOverride": true,
                "Entries": [{ "Name": "Gel", "Chance": 0.5, "MinStackSize": 2, "MaxStackSize": 5, "Prefix": 0 }]
            },
            "Spawning": { "ShouldSpawn": true, "ShouldReplace": false, "SpawnRateOverride": 40 }
        })],
        campaigns: vec![goblin_campaign()],
    };
    source.save(&original).expect("directory is writable");

    let mut scripts = NativeScriptHost::new();
    let mut registry = DefinitionRegistry::new();
    let report = registry.load(&source, &mut scripts).expect("directory is readable");
    assert_eq!(report.valid_count(), 2);

    let snapshot = registry.snapshot().expect("definitions encode");
    assert_eq!(snapshot.entities, original.entities);
    assert_eq!(snapshot.campaigns, original.campaigns);

    let definition = registry.find_entity("armored slime").expect("loaded");
    assert!(definition.should_update_on_hit());
    assert!(definition.should_aggressively_update());
    assert_eq!(definition.spawning().spawn_rate_override, Some(40));

    std::fs::remove_dir_all(&directory).expect("cleanup");
}

#[test]
fn missing_files_yield_no_entries() {
    let source = JsonDirectorySource::new(std::env::temp_dir().join("horde-definitions-absent"));
    let raw = source.load().expect("absent files are not errors");
    assert!(raw.entities.is_empty());
    assert!(raw.campaigns.is_empty());
}
