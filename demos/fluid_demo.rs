use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_particle_fluid::{SimulationParams, SphParticlePlugin};

fn main() {
    let mut params = SimulationParams::default();
    params.particle_count = 5000;
    params.delta_time = 0.004;

    App::new()
        .add_plugins((DefaultPlugins, FrameTimeDiagnosticsPlugin::default()))
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(params)
        .add_plugins(SphParticlePlugin)
        .add_systems(Startup, setup)
        .add_systems(Update, (adjust_params, log_fps))
        .run();
}

fn setup(mut commands: Commands) {
    // the billboard pass computes its own fixed view; the camera only
    // provides the render target
    commands.spawn(Camera3d::default());
}

// space pauses, up/down scale the smoothing radius (re-deriving the kernel
// constants), left/right scale the pressure constant
fn adjust_params(keys: Res<ButtonInput<KeyCode>>, mut params: ResMut<SimulationParams>) {
    if keys.just_pressed(KeyCode::Space) {
        params.simulate = !params.simulate;
        info!("simulate = {}", params.simulate);
    }
    if keys.just_pressed(KeyCode::ArrowUp) {
        let h = params.smoothing_radius() * 1.1;
        params.set_smoothing_radius(h);
        info!("smoothing radius = {h:.3}");
    }
    if keys.just_pressed(KeyCode::ArrowDown) {
        let h = params.smoothing_radius() / 1.1;
        params.set_smoothing_radius(h);
        info!("smoothing radius = {h:.3}");
    }
    if keys.just_pressed(KeyCode::ArrowRight) {
        params.pressure_constant *= 1.25;
        info!("pressure constant = {:.2}", params.pressure_constant);
    }
    if keys.just_pressed(KeyCode::ArrowLeft) {
        params.pressure_constant /= 1.25;
        info!("pressure constant = {:.2}", params.pressure_constant);
    }
}

fn log_fps(diagnostics: Res<DiagnosticsStore>, mut counter: Local<u32>) {
    *counter += 1;
    if *counter >= 120 {
        *counter = 0;
        if let Some(fps_diag) = diagnostics.get(&FrameTimeDiagnosticsPlugin::FPS) {
            if let Some(avg) = fps_diag.average() {
                info!("==== Average FPS over last ~2 s: {avg:.1} ====");
            }
        }
    }
}
