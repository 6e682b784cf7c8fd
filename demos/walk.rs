use macroquad::prelude::*;
use macroquad_tiled_rpg::{Actor, EngineConfig, Renderer, World};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SPEED: f64 = 120.0;

fn window_conf() -> Conf {
    Conf {
        window_title: "Tiled RPG".into(),
        window_width: 700,
        window_height: 700,
        ..Default::default()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// cargo run --example walk -- assets map.tmx [engine.json]
#[macroquad::main(window_conf)]
async fn main() {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| "assets".into());
    let map = args.next().unwrap_or_else(|| "map.tmx".into());

    let mut config = match args.next() {
        Some(path) => EngineConfig::from_json_file(&path).expect("Failed to load config"),
        None => EngineConfig::default(),
    };
    config.asset_root = root.into();

    let mut world = World::load(config, &map).expect("Failed to load map");
    let mut renderer = Renderer::new();
    let mut actor = Actor::new(0.0, 0.0, 16.0, 16.0);
    world.place_actor(&mut actor, 50.0, 250.0);

    loop {
        let dt = get_frame_time() as f64;
        let mut dx = 0.0;
        let mut dy = 0.0;
        if is_key_down(KeyCode::A) { dx -= 1.0; }
        if is_key_down(KeyCode::D) { dx += 1.0; }
        if is_key_down(KeyCode::W) { dy -= 1.0; }
        if is_key_down(KeyCode::S) { dy += 1.0; }
        actor.set_position(actor.x + dx * SPEED * dt, actor.y + dy * SPEED * dt);

        let now_ms = (get_time() * 1000.0) as u64;
        match world.tick(&mut actor, now_ms) {
            Ok(result) => {
                if let Some(enemy) = &result.enemy {
                    // No fight screen here: resolve the encounter right away.
                    info!(enemy = %enemy, "enemy_defeated");
                    world.mark_object_as_encountered(enemy);
                    world.reset_interaction_state();
                }
                if result.npc.is_some() || result.shop.is_some() {
                    world.reset_interaction_state();
                }
            }
            Err(err) => error!(error = %err, "tick_failed"),
        }

        clear_background(BLACK);
        renderer.draw(&world);

        let cam = world.camera();
        let p = cam.world_to_screen(vec2(actor.x as f32, actor.y as f32));
        let z = cam.zoom();
        draw_rectangle(p.x, p.y, actor.width as f32 * z, actor.height as f32 * z, YELLOW);

        draw_text(
            &format!("HP {}  studs {}  {}", actor.health, actor.item_count("study_stud"), world.map_name()),
            10.0,
            24.0,
            24.0,
            WHITE,
        );

        next_frame().await;
    }
}
