//! Headless run of the engine against the reference world.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use horde_core::{ArchetypeId, EntitySlot, Host, Vec2, TILE_SIZE};
use horde_engine::{Engine, Issuer};
use horde_world::{query, World};

/// Simulated time between two ticks.
const TICK: Duration = Duration::from_millis(16);
/// World width in tiles.
const WORLD_WIDTH: i32 = 1_200;
/// World height in tiles.
const WORLD_HEIGHT: i32 = 400;
/// First solid row of the flat world.
const GROUND_ROW: i32 = 140;
/// Horizontal spacing between connected players in pixels.
const PLAYER_SPACING: f32 = 4_800.0;
/// Player hitbox height; players stand on the ground row.
const PLAYER_HEIGHT: f32 = 42.0;
/// Horizontal offset of host-spawned entities from their player.
const NATIVE_OFFSET: f32 = 320.0;

/// Knobs of a simulated session.
#[derive(Clone, Debug)]
pub(crate) struct Scenario {
    pub(crate) players: usize,
    pub(crate) ticks: u64,
    pub(crate) kill_every: u64,
    pub(crate) native_every: u64,
    pub(crate) native_archetype: ArchetypeId,
    pub(crate) commands: Vec<String>,
}

/// Totals gathered over a simulated session.
#[derive(Clone, Debug, Default)]
pub(crate) struct Summary {
    pub(crate) ticks: u64,
    pub(crate) kills: u64,
    pub(crate) alive: usize,
    pub(crate) custom: usize,
    pub(crate) drops: u32,
    pub(crate) messages: Vec<String>,
    pub(crate) campaign: Option<String>,
    pub(crate) script_faults: u64,
}

/// Builds a flat world with `players` players standing on the ground.
fn world(players: usize) -> Result<World> {
    let mut world = World::new(WORLD_WIDTH, WORLD_HEIGHT);
    world.fill_ground(GROUND_ROW);
    let feet = (GROUND_ROW * TILE_SIZE) as f32 - PLAYER_HEIGHT;
    for index in 0..players {
        let x = PLAYER_SPACING * (index as f32 + 1.0);
        let name = format!("player{}", index + 1);
        if world.connect_player(&name, Vec2::new(x, feet)).is_none() {
            bail!("no free slot for {name}");
        }
    }
    Ok(world)
}

/// Runs the scenario to completion and reports what happened.
pub(crate) fn run(engine: &mut Engine, scenario: &Scenario) -> Result<Summary> {
    let mut world = world(scenario.players)?;
    let mut events = Vec::new();
    let mut summary = Summary::default();
    let console = Issuer::console();

    for line in &scenario.commands {
        match engine.run_command(&mut world, &console, line, &mut events) {
            Ok(Some(reply)) => println!("{reply}"),
            Ok(None) => {}
            Err(error) => bail!("`{line}` failed: {error}"),
        }
    }

    let start = Instant::now();
    for tick in 1..=scenario.ticks {
        let now = start + TICK * u32::try_from(tick).context("tick count overflows")?;

        if scenario.native_every > 0 && tick % scenario.native_every == 0 {
            spawn_natives(engine, &mut world, scenario.native_archetype);
        }

        engine.on_tick(&mut world, now, &mut events);

        let slots: Vec<EntitySlot> = world.entity_view().iter().map(|entity| entity.slot).collect();
        for slot in slots {
            let _ = engine.on_ai_update(&mut world, slot, &mut events);
        }

        if scenario.kill_every > 0 && tick % scenario.kill_every == 0 {
            let victim = world.entity_view().iter().next().map(|entity| entity.slot);
            if let Some(slot) = victim {
                engine.on_killed(&mut world, slot, &mut events);
                let _ = world.despawn(slot);
                summary.kills += 1;
            }
        }

        events.clear();
        summary.ticks = tick;
    }

    summary.alive = query::entity_count(&world);
    summary.custom = engine.custom_entities().attached_count();
    summary.drops = query::drops(&world).iter().map(|drop| drop.stack).sum();
    summary.messages = query::messages(&world)
        .iter()
        .map(|message| message.text.clone())
        .collect();
    summary.campaign = engine
        .campaign()
        .runtime()
        .map(|runtime| format!("{} wave {}", runtime.campaign(), runtime.wave() + 1));
    summary.script_faults = engine.dispatcher().faults();
    Ok(summary)
}

/// Lets the host place one entity of its own beside every player.
fn spawn_natives(engine: &mut Engine, world: &mut World, archetype: ArchetypeId) {
    let ground = (GROUND_ROW * TILE_SIZE) as f32;
    let players: Vec<f32> = world
        .player_view()
        .iter()
        .map(|player| player.center().x)
        .collect();
    for x in players {
        if let Some(slot) = world.spawn_native(archetype, Vec2::new(x + NATIVE_OFFSET, ground)) {
            engine.on_entity_spawned(slot);
        }
    }
}
