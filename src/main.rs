//! Headless demo of the transform hierarchy
//!
//! Builds a small orbiting system, moves it, reparents and despawns nodes,
//! and logs world positions along the way. Run with `RUST_LOG=debug` to see
//! structural changes, `RUST_LOG=trace` for recomputation.
//!
//! An optional argument names a `.ron` or `.json` config file.

use std::f64::consts::FRAC_PI_2;
use std::path::Path;

use spatial::prelude::*;

fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Config::load_json(path),
        _ => Config::load_ron(path),
    }
}

fn log_positions(world: &mut World, entities: &[Entity]) -> Result<(), HierarchyError> {
    for &entity in entities {
        let position = world.world_position(entity)?;
        let name = world.name(entity).unwrap_or_else(|| format!("{entity:?}"));
        log::info!(
            "{:>6}: ({:>8.3}, {:>8.3}, {:>8.3})",
            name,
            position.x,
            position.y,
            position.z
        );
    }
    Ok(())
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut world = World::with_config(config);
    let scene = GraphId(0);

    let sun = world.spawn_named(scene, "sun");
    let planet = world.spawn_named(scene, "planet");
    let moon = world.spawn_named(scene, "moon");
    world.set_parent(planet, Some(sun))?;
    world.set_parent(moon, Some(planet))?;

    world.set_scale(sun, Vector3::splat(2.0))?;
    world.set_position(planet, Vector3::new(5.0, 0.0, 0.0))?;
    world.set_position(moon, Vector3::new(1.5, 0.0, 0.0))?;
    world.start(sun)?;

    let bodies = [sun, planet, moon];
    log::info!("Initial layout");
    log_positions(&mut world, &bodies)?;

    // Quarter turn of the sun carries the whole subtree
    world.set_rotation(sun, Quaternion::from_rotation_y(FRAC_PI_2))?;
    log::info!("After rotating the sun");
    log_positions(&mut world, &bodies)?;

    // Detach the moon without moving it
    world.set_parent_with(moon, None, ReparentMode::KeepWorld)?;
    log::info!("After detaching the moon in place");
    log_positions(&mut world, &bodies)?;

    if let Err(err) = world.set_parent(sun, Some(planet)) {
        log::info!("Rejected: {err}");
    }

    world.despawn(planet)?;
    log::info!("After despawning the planet, {} entities remain", world.len());
    log_positions(&mut world, &[sun, moon])?;

    let unloaded = world.unload_graph(scene);
    log::info!("Unloaded {} entities", unloaded);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                return;
            }
        },
        None => Config::default(),
    };

    if let Err(e) = run(config) {
        eprintln!("Demo error: {}", e);
    }
}
