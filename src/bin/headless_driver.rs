//! Headless kart client
//!
//! Drives one kart around a flat arena with a scripted input sequence,
//! reports its position to the relay server and logs what the other players
//! are doing. Useful for load and smoke testing without a renderer.

use glam::Vec3;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use multikart::client::{NetworkSyncClient, PlayerIdentity, RemoteRoster, SyncEvent};
use multikart::config::ClientConfig;
use multikart::session::registry::SPAWN_POSITION;
use multikart::util::telemetry::init_tracing;
use multikart::util::time::{frame_delta, CLIENT_FPS};
use multikart::vehicle::{
    CollisionEvent, FrameInput, HudFrame, InputState, ObstacleAndRampInteraction, Tilt,
    VehicleControlModel, VehicleKinematics, VelocityController,
};

const GRAVITY: f32 = 9.81;
/// The arena floor is a square of this half-width centred on the origin
const ARENA_HALF_WIDTH: f32 = 60.0;
/// Ramp strip across the track
const RAMP_Z: (f32, f32) = (25.0, 26.0);
/// Length of the scripted drive
const SCRIPT_SECONDS: u32 = 30;

/// Point-mass stand-in for a rigid body
#[derive(Debug, Default)]
struct ToyBody {
    position: Vec3,
    velocity: Vec3,
}

impl VelocityController for ToyBody {
    fn apply_impulse(&mut self, impulse: Vec3) {
        // Unit mass
        self.velocity += impulse;
    }
}

/// Which surfaces the body touched last frame
#[derive(Debug, Default)]
struct Contacts {
    ground: bool,
    ramp: bool,
}

/// Controls for a given frame of the script
fn scripted_input(frame: u32) -> InputState {
    let second = frame / CLIENT_FPS;
    let mut input = InputState::default();

    match second {
        0..=5 => input.forward = true,
        6..=8 => {
            input.forward = true;
            input.right = true;
        }
        9..=11 => input.forward = true,
        12 => {
            input.forward = true;
            input.jump = frame % CLIENT_FPS == 0;
        }
        13..=15 => input.reverse = true,
        16..=18 => {
            input.reverse = true;
            input.left = true;
        }
        _ => input.forward = true,
    }

    input
}

fn over_floor(position: Vec3) -> bool {
    position.x.abs() <= ARENA_HALF_WIDTH && position.z.abs() <= ARENA_HALF_WIDTH
}

fn on_ramp(position: Vec3) -> bool {
    position.z >= RAMP_Z.0 && position.z <= RAMP_Z.1 && position.x.abs() <= 5.0
}

/// Integrate one frame and translate floor/ramp overlaps into contact events
fn integrate(
    body: &mut ToyBody,
    state: &mut VehicleKinematics,
    contacts: &mut Contacts,
    interaction: &ObstacleAndRampInteraction,
    dt: f32,
) {
    body.velocity.y -= GRAVITY * dt;
    body.position += body.velocity * dt;

    let touching_ground = over_floor(body.position) && body.position.y <= 0.0;
    if touching_ground {
        body.position.y = 0.0;
        body.velocity.y = body.velocity.y.max(0.0);
    }

    match (contacts.ground, touching_ground) {
        (false, true) => {
            let event = CollisionEvent::new("ground")
                .with_normal(Vec3::Y)
                .with_contact_point(body.position);
            interaction.on_collision_enter(state, &event, body);
        }
        (true, false) => interaction.on_collision_exit(state),
        _ => {}
    }
    contacts.ground = touching_ground;

    let touching_ramp = touching_ground && on_ramp(body.position);
    match (contacts.ramp, touching_ramp) {
        (false, true) => {
            let event = CollisionEvent::new("ramp").with_normal(Vec3::new(0.0, 0.7, -0.7));
            let outcome = interaction.on_collision_enter(state, &event, body);
            if outcome.ramp_boost.is_some() {
                info!(speed = state.signed_speed, "Launched off the ramp");
            }
        }
        (true, false) => interaction.on_collision_exit(state),
        _ => {}
    }
    contacts.ramp = touching_ramp;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env()?;
    init_tracing(&config.log_level);

    info!(url = %config.ws_url, name = %config.player_name, "Starting headless driver");

    let identity = PlayerIdentity::new(
        config.player_name.clone(),
        config.player_color.clone(),
        config.player_car.clone(),
    );
    let (client, mut events) = NetworkSyncClient::connect(config.ws_url.clone(), identity);

    let model = VehicleControlModel::default();
    let interaction = ObstacleAndRampInteraction::new(*model.tuning());
    let mut state = VehicleKinematics::spawn(0.0);
    let mut contacts = Contacts::default();
    let mut body = ToyBody {
        position: Vec3::new(
            SPAWN_POSITION[0] as f32,
            SPAWN_POSITION[1] as f32,
            SPAWN_POSITION[2] as f32,
        ),
        velocity: Vec3::ZERO,
    };
    let mut roster = RemoteRoster::new();

    let dt = frame_delta();
    let mut ticker = interval(std::time::Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frame = 0u32;
    let last_frame = SCRIPT_SECONDS * CLIENT_FPS;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let input = FrameInput {
                    controls: scripted_input(frame),
                    velocity: body.velocity,
                    tilt: Tilt::default(),
                    position: body.position,
                    dt,
                };

                let (next, output) = model.step(&state, &input);
                state = next;

                if let Some(reason) = output.terminal {
                    warn!(?reason, position = ?body.position, "Round over");
                    break;
                }

                body.velocity = output.velocity;
                if let Some(impulse) = output.impulse {
                    body.apply_impulse(impulse);
                    debug!("Jump");
                }
                integrate(&mut body, &mut state, &mut contacts, &interaction, dt);

                let p = body.position;
                client.send_movement(&[p.x as f64, p.y as f64, p.z as f64]);

                if frame % CLIENT_FPS == 0 {
                    let overlay = roster.overlay(HudFrame::from_output(&output, body.position));
                    info!(
                        speed = overlay.hud.speed,
                        drifting = overlay.hud.drifting,
                        airborne = overlay.hud.airborne,
                        position = ?overlay.hud.position,
                        status = ?overlay.status,
                        others = overlay.remote.len(),
                        "Frame"
                    );
                }

                frame += 1;
                if frame >= last_frame {
                    info!("Script finished");
                    break;
                }
            }
            Some(event) = events.recv() => {
                match &event {
                    SyncEvent::Connected { id } => info!(%id, "Connected"),
                    SyncEvent::Roster(players) => info!(count = players.len(), "Received roster"),
                    SyncEvent::PlayerJoined(player) => info!(id = %player.id, name = %player.name, "Player joined"),
                    SyncEvent::PlayerMoved { id, position } => debug!(%id, ?position, "Player moved"),
                    SyncEvent::PlayerLeft { id } => info!(%id, "Player left"),
                    SyncEvent::ConnectionError(msg) => warn!(error = %msg, "Could not connect, driving offline"),
                    SyncEvent::Disconnected(reason) => warn!(%reason, "Lost connection"),
                }
                roster.apply(&event);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    client.disconnect().await;
    info!("Headless driver stopped");
    Ok(())
}
