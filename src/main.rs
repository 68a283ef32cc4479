//! Headless host: loads the profile, plays a few runs on autopilot through
//! the session, then writes the profile back and exits.
//!
//! Usage: `alleydash [save-path] [config.ron]`

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alleydash::config::SessionConfig;
use alleydash::missions::Mission;
use alleydash::session::{GameFlow, SessionActionEvent, SessionPlugin};
use alleydash::shared::*;

const DEFAULT_SAVE_PATH: &str = "alleydash.bin";
const AUTOPILOT_RUNS: u32 = 3;
/// Autopilot track speed in metres per second.
const AUTOPILOT_SPEED: f32 = 250.0;
/// The autopilot hits an obstacle every this many metres.
const AUTOPILOT_OBSTACLE_SPACING: f32 = 400.0;

#[derive(Resource)]
struct Autopilot {
    save_path: PathBuf,
    runs_left: u32,
    next_obstacle: f32,
    acted_on_game_over: bool,
}

fn main() {
    let mut args = std::env::args().skip(1);
    let save_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_SAVE_PATH.to_string()));
    let config = args
        .next()
        .map(|path| load_config(Path::new(&path)))
        .unwrap_or_default();

    let profile_bytes = read_save(&save_path);

    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        .add_plugins(LogPlugin::default())
        .add_plugins(SessionPlugin::new(config).with_profile_bytes(profile_bytes))
        .insert_resource(Autopilot {
            save_path,
            runs_left: AUTOPILOT_RUNS,
            next_obstacle: AUTOPILOT_OBSTACLE_SPACING,
            acted_on_game_over: false,
        })
        .add_systems(Update, drive_autopilot)
        .run();
}

fn load_config(path: &Path) -> SessionConfig {
    match SessionConfig::load(path) {
        Ok(config) => config,
        Err(err) => {
            warn!("[Host] {}. Using default config.", err);
            SessionConfig::default()
        }
    }
}

fn read_save(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            warn!("[Host] Could not read {}: {}", path.display(), err);
            None
        }
    }
}

fn write_save(path: &Path, bytes: &[u8]) -> io::Result<()> {
    // Write to a temp file first, then rename for atomicity
    let tmp_path = path.with_extension("bin.tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)
}

/// Plays the role of the track simulation and the player's thumbs.
fn drive_autopilot(
    time: Res<Time>,
    mut pilot: ResMut<Autopilot>,
    flow: Option<ResMut<GameFlow>>,
    mut actions: EventWriter<SessionActionEvent>,
    mut exit: EventWriter<AppExit>,
) {
    let Some(mut flow) = flow else {
        exit.send(AppExit::error());
        return;
    };

    match flow.active_state() {
        Some(LOADOUT) => {
            pilot.acted_on_game_over = false;
            if flow.ctx.hud.run_button.interactable {
                pilot.next_obstacle = AUTOPILOT_OBSTACLE_SPACING;
                actions.send(SessionActionEvent(FlowAction::StartRun));
            }
        }
        Some(GAME) => {
            pilot.acted_on_game_over = false;
            if let Some(prompt) = &flow.ctx.hud.game_over_prompt {
                let action = if prompt.premium_for_life.interactable {
                    FlowAction::PremiumForLife
                } else {
                    FlowAction::DeclineSecondWind
                };
                actions.send(SessionActionEvent(action));
                return;
            }
            let ctx = &mut flow.ctx;
            if !ctx.run.is_moving {
                return;
            }
            if ctx.run.world_distance == 0.0 {
                pilot.next_obstacle = AUTOPILOT_OBSTACLE_SPACING;
            }
            let dt = ctx.clock.scaled(time.delta_secs());
            ctx.run.world_distance += AUTOPILOT_SPEED * dt;
            ctx.run.score = ctx.run.world_distance as u32;
            ctx.run.collect_coin();
            if ctx.run.world_distance >= pilot.next_obstacle {
                pilot.next_obstacle += AUTOPILOT_OBSTACLE_SPACING;
                ctx.run.lose_life();
            } else {
                ctx.run.barriers_jumped += 1;
            }
        }
        Some(GAME_OVER) => {
            if pilot.acted_on_game_over {
                return;
            }
            pilot.acted_on_game_over = true;

            let completed: Vec<Mission> = flow
                .ctx
                .profile
                .missions
                .iter()
                .filter(|m| m.is_complete())
                .cloned()
                .collect();
            for mission in &completed {
                if let Err(err) = flow.ctx.claim_mission(mission) {
                    warn!("[Host] Claim failed: {}", err);
                }
            }

            pilot.runs_left = pilot.runs_left.saturating_sub(1);
            if pilot.runs_left > 0 {
                let action = if pilot.runs_left % 2 == 0 {
                    FlowAction::RunAgain
                } else {
                    FlowAction::GoToLoadout
                };
                actions.send(SessionActionEvent(action));
                return;
            }

            // Leaving the results screen settles the last run.
            if flow.ctx.run.in_progress {
                flow.ctx.record_highscore();
            }
            flow.ctx.finish_run();
            let bytes = flow.save_bytes();
            match write_save(&pilot.save_path, &bytes) {
                Ok(()) => info!(
                    "[Host] Saved profile to {} ({} coins, {} premium)",
                    pilot.save_path.display(),
                    flow.ctx.profile.coins,
                    flow.ctx.profile.premium
                ),
                Err(err) => error!("[Host] Could not write save: {}", err),
            }
            exit.send(AppExit::Success);
        }
        _ => {}
    }
}
