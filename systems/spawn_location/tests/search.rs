use horde_core::{Host, PlayerView, TileCoord, TileQuery, Vec2};
use horde_system_spawn_location::{find_clear_tile, SpawnGeometry, SpawnLocationSearch};
use horde_world::{Tile, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const GROUND_ROW: i32 = 40;

fn flat_world(width: i32, height: i32) -> World {
    let mut world = World::new(width, height);
    world.fill_ground(GROUND_ROW);
    world
}

fn search(world: &World) -> SpawnLocationSearch {
    SpawnLocationSearch::new(SpawnGeometry::from_world(&world.world_info()))
}

#[test]
fn finds_ground_on_a_flat_world() {
    let world = flat_world(200, 100);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..20 {
        let tile = search(&world)
            .find(TileCoord::new(100, 30), &PlayerView::default(), &world, &mut rng)
            .expect("open ground is always reachable");
        assert_eq!(tile.y(), GROUND_ROW);
        assert!(world.is_solid(tile));
        assert!(!world.is_solid(tile.offset(0, -1)));
    }
}

#[test]
fn solid_world_has_no_spawn_location() {
    let mut world = World::new(100, 60);
    world.fill_ground(0);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let found = search(&world).find(
        TileCoord::new(50, 30),
        &PlayerView::default(),
        &world,
        &mut rng,
    );

    assert_eq!(found, None);
}

#[test]
fn lava_above_the_ground_blocks_every_spawn() {
    let mut world = flat_world(100, 60);
    world.fill(
        TileCoord::new(0, GROUND_ROW - 2),
        TileCoord::new(99, GROUND_ROW - 1),
        Tile::LAVA,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let found = search(&world).find(
        TileCoord::new(50, 30),
        &PlayerView::default(),
        &world,
        &mut rng,
    );

    assert_eq!(found, None);
}

#[test]
fn houses_are_never_chosen() {
    let mut world = flat_world(100, 60);
    world.fill(
        TileCoord::new(0, 0),
        TileCoord::new(99, GROUND_ROW - 1),
        Tile::HOUSE,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let found = search(&world).find(
        TileCoord::new(50, 30),
        &PlayerView::default(),
        &world,
        &mut rng,
    );

    assert_eq!(found, None);
}

#[test]
fn ground_in_view_of_a_player_is_rejected() {
    let mut world = flat_world(100, 60);
    let anchor = TileCoord::new(50, 30);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    assert!(search(&world)
        .find(anchor, &PlayerView::default(), &world, &mut rng)
        .is_some());

    let _ = world
        .connect_player("watcher", Vec2::new(790.0, 459.0))
        .expect("player slot available");
    let players = world.player_view();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let found = search(&world).find(anchor, &players, &world, &mut rng);

    assert_eq!(found, None);
    assert!(!search(&world).is_unseen(TileCoord::new(0, GROUND_ROW), &players));
}

#[test]
fn empty_range_finds_nothing() {
    let world = flat_world(100, 60);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let found = search(&world).find_within(
        TileCoord::new(150, 30),
        10,
        10,
        &PlayerView::default(),
        &world,
        &mut rng,
    );

    assert_eq!(found, None);
}

#[test]
fn clear_tile_falls_back_to_the_anchor() {
    let mut world = World::new(60, 60);
    world.fill_ground(0);
    let anchor = TileCoord::new(30, 30);
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    assert_eq!(find_clear_tile(anchor, 50, 50, &world, &mut rng), anchor);
}

#[test]
fn clear_tile_stays_within_range() {
    let world = flat_world(100, 60);
    let anchor = TileCoord::new(10, 5);
    let mut rng = ChaCha8Rng::seed_from_u64(4);

    for _ in 0..50 {
        let tile = find_clear_tile(anchor, 8, 8, &world, &mut rng);
        assert!((2..=18).contains(&tile.x()));
        assert!((0..=13).contains(&tile.y()));
        assert!(!world.is_solid(tile));
    }
}
