//! Headless demo level: one player on autopilot, a spawner feeding enemies
//! northwards, and a piano that clears the lane it faces.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use beat_runner_core::gameplay::{
    BeatPulse, Direction, EnemyId, EnemyMover, EnemySpawner, EnemyStep, GridCell, Instrument,
    InstrumentId, InstrumentKind, MoveOutcome, PlayerMover, TileMap,
};
use beat_runner_core::{
    AccuracyGrade, AppConfig, AudioEngine, MusicSession, PlaybackClock, Result, Scheduler,
    StopMode, Thresholds,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

const PIANO: InstrumentId = InstrumentId(1);
const PLAYER_START: GridCell = GridCell::new(1, 6);
const PIANO_CELL: GridCell = GridCell::new(2, 6);
const SPAWN_CELL: GridCell = GridCell::new(5, 0);
// Loops back to the start tile, playing the piano once per lap.
const ROUTE: [Direction; 5] = [
    Direction::East,
    Direction::West,
    Direction::East,
    Direction::South,
    Direction::North,
];

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub seconds: f64,
    pub fps: u32,
    /// Upper bound of the autopilot's reaction time after each beat.
    pub max_reaction_secs: f64,
    pub seed: u64,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub beats: u64,
    pub bars: u32,
    pub drifts: u32,
    pub markers: u32,
    pub moves: u32,
    pub blocked: u32,
    pub off_beat: u32,
    pub grades: BTreeMap<AccuracyGrade, u32>,
    pub spawned: u32,
    pub defeated: u32,
    pub peak_pulse: f32,
}

impl RunSummary {
    pub fn to_json(&self) -> serde_json::Value {
        let grades: serde_json::Map<String, serde_json::Value> = self
            .grades
            .iter()
            .map(|(grade, count)| (grade.label().to_string(), (*count).into()))
            .collect();
        serde_json::json!({
            "beats": self.beats,
            "bars": self.bars,
            "drifts": self.drifts,
            "markers": self.markers,
            "moves": self.moves,
            "blocked": self.blocked,
            "off_beat": self.off_beat,
            "grades": grades,
            "spawned": self.spawned,
            "defeated": self.defeated,
            "peak_pulse": self.peak_pulse,
        })
    }
}

fn build_level() -> TileMap {
    let mut map = TileMap::rectangle(GridCell::new(0, 0), GridCell::new(7, 9));
    map.add_wall(GridCell::new(1, 7));
    map.place_instrument(PIANO_CELL, PIANO);
    map
}

/// Counter shared with a clock subscription: one handle to read, one to move
/// into the handler.
fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    (Rc::clone(&count), count)
}

pub fn run<E: AudioEngine>(engine: E, config: &AppConfig, options: RunOptions) -> Result<RunSummary> {
    let mut session = MusicSession::new(engine, config);
    if let Err(err) = session.initialize() {
        warn!(%err, "running without music");
    } else if let Err(err) = session.start_music() {
        warn!(%err, "music did not start");
    }

    let level = build_level();
    let thresholds = Thresholds::from_config(&config.timing)?;
    let gameplay = &config.gameplay;

    let (bars, bar_sink) = counter();
    session.on_bar_start(move |bar| {
        bar_sink.set(bar_sink.get() + 1);
        debug!(bar = bar.bar_index, "bar");
    });
    let (drifts, drift_sink) = counter();
    session
        .clock_mut()
        .on_drift(move |_| drift_sink.set(drift_sink.get() + 1));
    let (markers, marker_sink) = counter();
    session.clock_mut().on_marker(move |marker| {
        marker_sink.set(marker_sink.get() + 1);
        info!(position_ms = marker.position.position_ms, "timeline marker");
    });
    let (beats_seen, beat_sink) = counter();
    session.on_beat(move |_| beat_sink.set(beat_sink.get() + 1));

    let clock = session.clock_mut();
    let mut player = PlayerMover::spawn(clock, PLAYER_START, config.timing.move_window_secs, thresholds);
    let mut spawner = EnemySpawner::spawn(clock, SPAWN_CELL, gameplay.beats_per_spawn);
    let pulse = BeatPulse::spawn(clock, gameplay.pulse_scale, gameplay.pulse_duration_secs);
    let mut piano = Instrument::new(
        PIANO,
        InstrumentKind::Piano,
        PIANO_CELL,
        Direction::East,
        gameplay.attack_range,
        gameplay.attack_delay_secs,
    );
    let mut enemies: Vec<EnemyMover> = Vec::new();
    let mut next_enemy = 0u32;

    let mut rng = SmallRng::seed_from_u64(options.seed);
    let mut inputs: Scheduler<Direction> = Scheduler::new();
    let mut route = ROUTE.iter().copied().cycle();
    let mut handled_beats = 0u32;

    let mut summary = RunSummary::default();
    let frame = Duration::from_secs_f64(1.0 / f64::from(options.fps.max(1)));
    let playback = PlaybackClock::start();
    let mut now = playback.now_secs();

    while now < options.seconds {
        session.update(now);

        // Autopilot: answer every beat after a random reaction time.
        while handled_beats < beats_seen.get() {
            handled_beats += 1;
            let reaction = rng.random_range(0.0..=options.max_reaction_secs.max(0.0));
            if let Some(direction) = route.next() {
                inputs.schedule(now + reaction, direction);
            }
        }

        for direction in inputs.drain_due(now) {
            match player.try_move(direction, &level, now) {
                MoveOutcome::Moved { to, grade } => {
                    summary.moves += 1;
                    *summary.grades.entry(grade).or_default() += 1;
                    info!(?to, %grade, "player moved");
                }
                MoveOutcome::Interacted { instrument, grade } => {
                    *summary.grades.entry(grade).or_default() += 1;
                    info!(?instrument, %grade, "player played");
                    piano.activate(now);
                }
                MoveOutcome::Blocked => summary.blocked += 1,
                MoveOutcome::OffBeat => summary.off_beat += 1,
            }
        }

        if let Some(request) = spawner.update(now) {
            next_enemy += 1;
            let id = EnemyId(next_enemy);
            enemies.push(EnemyMover::spawn(
                session.clock_mut(),
                id,
                request.cell,
                gameplay.beats_per_enemy_move,
            ));
            summary.spawned += 1;
            info!(?id, cell = ?request.cell, "enemy spawned");
        }

        for enemy in &mut enemies {
            if let Some(EnemyStep::Moved(cell)) = enemy.update(&level, now) {
                debug!(id = ?enemy.id(), ?cell, "enemy advanced");
            }
        }

        let targets: Vec<(EnemyId, GridCell)> = enemies
            .iter()
            .map(|enemy| (enemy.id(), enemy.position()))
            .collect();
        let hits = piano.update(now, &targets);
        if !hits.is_empty() {
            let (defeated, alive): (Vec<_>, Vec<_>) = enemies
                .into_iter()
                .partition(|enemy| hits.contains(&enemy.id()));
            for enemy in defeated {
                info!(id = ?enemy.id(), "enemy defeated");
                enemy.despawn(session.clock_mut());
                summary.defeated += 1;
            }
            enemies = alive;
        }

        summary.peak_pulse = summary.peak_pulse.max(pulse.scale_at(now));

        thread::sleep(frame);
        now = playback.now_secs();
    }

    if let Err(err) = session.stop_music(StopMode::AllowFadeOut, now) {
        warn!(%err, "music did not stop cleanly");
    }
    info!("\n{}", session.overlay());

    summary.beats = session.clock().beats_processed();
    summary.bars = bars.get();
    summary.drifts = drifts.get();
    summary.markers = markers.get();

    for enemy in enemies {
        enemy.despawn(session.clock_mut());
    }
    player.despawn(session.clock_mut());
    spawner.despawn(session.clock_mut());
    pulse.despawn(session.clock_mut());
    session.shutdown();

    Ok(summary)
}
