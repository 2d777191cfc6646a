use bevy::prelude::*;
use bevy_particle_fluid::{GravityParticlePlugin, SimulationParams};

fn main() {
    let mut params = SimulationParams::default();
    params.particle_count = 10_000;

    App::new()
        .add_plugins(DefaultPlugins)
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(params)
        .add_plugins(GravityParticlePlugin)
        .add_systems(Startup, setup)
        .add_systems(Update, adjust_params)
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera3d::default());
}

fn adjust_params(keys: Res<ButtonInput<KeyCode>>, mut params: ResMut<SimulationParams>) {
    if keys.just_pressed(KeyCode::Space) {
        params.simulate = !params.simulate;
        info!("simulate = {}", params.simulate);
    }
    if keys.just_pressed(KeyCode::ArrowUp) {
        params.gravity += 1.0;
        info!("gravity = {:.1}", params.gravity);
    }
    if keys.just_pressed(KeyCode::ArrowDown) {
        params.gravity -= 1.0;
        info!("gravity = {:.1}", params.gravity);
    }
    if keys.just_pressed(KeyCode::KeyB) {
        params.bounce = (params.bounce + 0.1).min(1.0);
        info!("bounce = {:.1}", params.bounce);
    }
    if keys.just_pressed(KeyCode::KeyV) {
        params.bounce = (params.bounce - 0.1).max(0.0);
        info!("bounce = {:.1}", params.bounce);
    }
}
