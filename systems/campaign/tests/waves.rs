use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use horde_core::{
    CampaignProgress, Command, EntityKey, MessageColor, PlayerSlot, PlayerSnapshot, PlayerView,
    TileCoord, Vec2, WorldInfo, SUPPRESSED_ACTIVE_ENTITIES,
};
use horde_definitions::{DefinitionRegistry, InMemorySource};
use horde_scripting::{HookDispatcher, HookName, HookValue, NativeScript, NativeScriptHost};
use horde_system_campaign::{Phase, WaveStateMachine};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};

fn world() -> WorldInfo {
    WorldInfo::new(TileCoord::new(500, 200), 200)
}

fn player(index: u8, active_entities: u32) -> PlayerSnapshot {
    PlayerSnapshot {
        slot: PlayerSlot::new(index),
        name: format!("player{index}"),
        position: Vec2::new(8_000.0, 3_000.0),
        size: Vec2::new(20.0, 42.0),
        active_entities,
        immune: false,
    }
}

fn players(count: u8) -> PlayerView {
    PlayerView::from_snapshots((0..count).map(|index| player(index, 0)).collect())
}

fn goblin_army(scale: bool) -> Value {
    json!({
        "Name": "Goblin Army",
        "CompletedMessage": "The goblins retreat!",
        "PointValues": { "Goblin": 60, "26": 50 },
        "ScaleByPlayers": scale,
        "Waves": [
            {
                "StartMessage": "Goblins approach...",
                "PointsRequired": 100,
                "Miniboss": "Boss1",
                "MaxSpawns": 10,
                "SpawnRate": 1,
                "Weights": { "Goblin": 3, "26": 1 }
            },
            {
                "StartMessage": "The warlord arrives!",
                "PointsRequired": 20,
                "MaxSpawns": 10,
                "SpawnRate": 1,
                "Weights": { "Goblin": 1 }
            }
        ]
    })
}

fn registry(campaigns: Vec<Value>, scripts: &mut NativeScriptHost) -> DefinitionRegistry {
    let mut registry = DefinitionRegistry::new();
    let report = registry
        .load(&InMemorySource::from_values(Vec::new(), campaigns), scripts)
        .expect("in-memory source is readable");
    assert!(report.rejected.is_empty(), "{:?}", report.rejected);
    registry
}

fn broadcasts(out: &[Command]) -> Vec<(&str, MessageColor)> {
    out.iter()
        .filter_map(|command| match command {
            Command::Broadcast { message, color } => Some((message.as_str(), *color)),
            _ => None,
        })
        .collect()
}

#[test]
fn points_clamp_and_the_miniboss_holds_the_gate() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(false)], &mut scripts);
    let campaign = registry.find_campaign("goblin army").expect("loaded");
    let players = players(1);
    let mut machine = WaveStateMachine::new();
    let mut dispatcher = HookDispatcher::new();
    let mut out = Vec::new();
    let now = Instant::now();

    machine.start(campaign, players.len(), &mut out);
    assert_eq!(
        broadcasts(&out),
        vec![("Goblins approach...", MessageColor::WAVE)]
    );
    out.clear();

    let goblin = EntityKey::parse("goblin");
    assert!(machine.on_kill(&goblin, &registry, &players, &world(), &mut out));
    assert_eq!(machine.runtime().map(|runtime| runtime.points()), Some(60));
    assert!(machine.on_kill(&EntityKey::parse("26"), &registry, &players, &world(), &mut out));
    assert_eq!(machine.runtime().map(|runtime| runtime.points()), Some(100));
    assert_eq!(
        out.last(),
        Some(&Command::ReportProgress {
            player: PlayerSlot::new(0),
            progress: CampaignProgress {
                points: 100,
                required: 100,
                wave: 1
            }
        })
    );

    machine.update(now, &registry, &players, &world(), &mut dispatcher, &mut out);
    machine.update(now, &registry, &players, &world(), &mut dispatcher, &mut out);
    assert_eq!(machine.phase(), Phase::MinibossGate { wave: 0 });

    assert!(machine.on_kill(&EntityKey::parse("BOSS1"), &registry, &players, &world(), &mut out));
    assert_eq!(machine.phase(), Phase::WaveActive { wave: 0 });
    out.clear();

    machine.update(now, &registry, &players, &world(), &mut dispatcher, &mut out);
    assert_eq!(machine.phase(), Phase::WaveActive { wave: 1 });
    assert_eq!(
        broadcasts(&out),
        vec![("The warlord arrives!", MessageColor::WAVE)]
    );
}

#[test]
fn last_wave_completes_the_campaign() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(false)], &mut scripts);
    let campaign = registry.find_campaign("Goblin Army").expect("loaded");
    let players = players(1);
    let mut machine = WaveStateMachine::new();
    let mut dispatcher = HookDispatcher::new();
    let mut out = Vec::new();
    let now = Instant::now();

    machine.start(campaign, 1, &mut out);
    let boss = EntityKey::parse("Boss1");
    let goblin = EntityKey::parse("Goblin");
    assert!(machine.on_kill(&boss, &registry, &players, &world(), &mut out));
    assert!(machine.on_kill(&goblin, &registry, &players, &world(), &mut out));
    assert!(machine.on_kill(&goblin, &registry, &players, &world(), &mut out));
    machine.update(now, &registry, &players, &world(), &mut dispatcher, &mut out);
    assert_eq!(machine.phase(), Phase::WaveActive { wave: 1 });

    assert!(machine.on_kill(&goblin, &registry, &players, &world(), &mut out));
    out.clear();
    machine.update(now, &registry, &players, &world(), &mut dispatcher, &mut out);

    assert_eq!(machine.phase(), Phase::Idle);
    assert_eq!(
        broadcasts(&out),
        vec![("The goblins retreat!", MessageColor::COMPLETED)]
    );
}

#[test]
fn unknown_kills_do_not_count() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(false)], &mut scripts);
    let mut machine = WaveStateMachine::new();
    let mut out = Vec::new();
    machine.start(registry.find_campaign("Goblin Army").expect("loaded"), 1, &mut out);
    out.clear();

    assert!(!machine.on_kill(&EntityKey::parse("1"), &registry, &players(1), &world(), &mut out));
    assert_eq!(machine.runtime().map(|runtime| runtime.points()), Some(0));
    assert!(out.is_empty());
}

#[test]
fn required_points_scale_with_players() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(true)], &mut scripts);
    let mut machine = WaveStateMachine::new();
    let mut out = Vec::new();

    machine.start(registry.find_campaign("Goblin Army").expect("loaded"), 3, &mut out);

    assert_eq!(machine.runtime().map(|runtime| runtime.required()), Some(300));
}

#[test]
fn periodic_progress_is_throttled() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(false)], &mut scripts);
    let players = players(2);
    let mut machine = WaveStateMachine::new();
    let mut dispatcher = HookDispatcher::new();
    let mut out = Vec::new();
    machine.start(registry.find_campaign("Goblin Army").expect("loaded"), 2, &mut out);
    let start = Instant::now();

    let mut reports_at = |offset: Duration, machine: &mut WaveStateMachine| {
        let mut out = Vec::new();
        machine.update(start + offset, &registry, &players, &world(), &mut dispatcher, &mut out);
        out.iter()
            .filter(|command| matches!(command, Command::ReportProgress { .. }))
            .count()
    };

    assert_eq!(reports_at(Duration::ZERO, &mut machine), 2);
    assert_eq!(reports_at(Duration::from_millis(500), &mut machine), 0);
    assert_eq!(reports_at(Duration::from_millis(1_000), &mut machine), 0);
    assert_eq!(reports_at(Duration::from_millis(1_001), &mut machine), 2);
    assert_eq!(reports_at(Duration::from_millis(1_600), &mut machine), 0);
}

#[test]
fn update_hook_runs_every_tick() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut scripts = NativeScriptHost::new();
    scripts.register(
        "army.lua",
        NativeScript::new().with_hook(HookName::Update, move |_call, _out| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            Ok(HookValue::Unit)
        }),
    );
    let mut campaign = goblin_army(false);
    campaign["ScriptPath"] = json!("army.lua");
    let registry = registry(vec![campaign], &mut scripts);
    let mut machine = WaveStateMachine::new();
    let mut dispatcher = HookDispatcher::new();
    let mut out = Vec::new();
    machine.start(registry.find_campaign("Goblin Army").expect("loaded"), 1, &mut out);

    for _ in 0..3 {
        machine.update(Instant::now(), &registry, &players(1), &world(), &mut dispatcher, &mut out);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn campaigns_missing_after_a_reload_stop() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(false)], &mut scripts);
    let mut machine = WaveStateMachine::new();
    let mut dispatcher = HookDispatcher::new();
    let mut out = Vec::new();
    machine.start(registry.find_campaign("Goblin Army").expect("loaded"), 1, &mut out);

    let empty = DefinitionRegistry::new();
    machine.update(Instant::now(), &empty, &players(1), &world(), &mut dispatcher, &mut out);

    assert_eq!(machine.phase(), Phase::Idle);
}

#[test]
fn spawns_respect_the_cap_and_suppress_host_spawns() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(false)], &mut scripts);
    let mut machine = WaveStateMachine::new();
    let mut out = Vec::new();
    machine.start(registry.find_campaign("Goblin Army").expect("loaded"), 1, &mut out);
    out.clear();
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let capped = machine.try_spawn(&player(0, 10), &registry, &world(), &mut rng, |_| false, &mut out);
    assert_eq!(capped, None);
    assert!(out.is_empty());

    let picked = machine
        .try_spawn(&player(0, 3), &registry, &world(), &mut rng, |_| false, &mut out)
        .expect("spawn rate of one always spawns");
    assert!(picked == EntityKey::parse("Goblin") || picked == EntityKey::parse("26"));
    assert_eq!(
        out,
        vec![Command::SetActiveEntityCount {
            player: PlayerSlot::new(0),
            count: SUPPRESSED_ACTIVE_ENTITIES
        }]
    );
}

#[test]
fn closed_gate_spawns_only_a_missing_miniboss() {
    let mut scripts = NativeScriptHost::new();
    let registry = registry(vec![goblin_army(false)], &mut scripts);
    let players = players(1);
    let mut machine = WaveStateMachine::new();
    let mut out = Vec::new();
    machine.start(registry.find_campaign("Goblin Army").expect("loaded"), 1, &mut out);
    let goblin = EntityKey::parse("Goblin");
    assert!(machine.on_kill(&goblin, &registry, &players, &world(), &mut out));
    assert!(machine.on_kill(&goblin, &registry, &players, &world(), &mut out));
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let boss = EntityKey::parse("boss1");

    for _ in 0..10 {
        let spawned =
            machine.try_spawn(&player(0, 0), &registry, &world(), &mut rng, |_| false, &mut out);
        assert_eq!(spawned.as_ref(), Some(&boss));
    }
    let alive = machine.try_spawn(
        &player(0, 0),
        &registry,
        &world(),
        &mut rng,
        |key| *key == boss,
        &mut out,
    );
    assert_eq!(alive, None);
}
