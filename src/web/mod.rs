use std::{
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{
    clock::{Clock, Speed},
    commands::{Command, CommandError, CommandOutcome},
    engine::{Engine, EngineBuilder, EngineSettings, TickReport, MAX_TICK_DAYS},
    events::Notification,
    scenario::Scenario,
    world::{SettlementSnapshot, World},
};

/// Pushed to every `/api/events` subscriber after a tick or a command.
#[derive(Clone, Serialize)]
pub struct UiFrame {
    pub tick: u64,
    pub clock: Clock,
    pub snapshot: SettlementSnapshot,
    pub notifications: Vec<Notification>,
}

#[derive(Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub clock: Clock,
    pub snapshot: SettlementSnapshot,
}

struct Session {
    engine: Engine,
    world: World,
    clock: Clock,
}

impl Session {
    fn frame(&self, notifications: Vec<Notification>) -> UiFrame {
        UiFrame {
            tick: self.world.tick(),
            clock: self.clock,
            snapshot: self.world.snapshot(self.engine.scenario_name()),
            notifications,
        }
    }

    fn frame_from_report(&self, report: TickReport) -> UiFrame {
        UiFrame {
            tick: report.tick,
            clock: self.clock,
            snapshot: report.snapshot,
            notifications: report.notifications,
        }
    }
}

#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
    broadcaster: broadcast::Sender<String>,
}

impl AppState {
    fn new(
        scenario: &Scenario,
        snapshot_interval: u64,
        snapshot_dir: PathBuf,
        speed: Speed,
        start_paused: bool,
    ) -> Result<Self> {
        let world = scenario.build_world()?;
        let settings = EngineSettings {
            scenario_name: scenario.name.clone(),
            seed: scenario.seed,
            tick_days: speed.days_per_tick(),
            snapshot_interval_ticks: snapshot_interval,
            snapshot_dir,
        };
        let engine = EngineBuilder::new(settings).with_standard_systems().build();
        let (broadcaster, _) = broadcast::channel::<String>(512);
        Ok(Self {
            session: Arc::new(Mutex::new(Session {
                engine,
                world,
                clock: Clock::new(speed, !start_paused),
            })),
            broadcaster,
        })
    }

    /// A panic while holding the lock leaves the session as the last
    /// completed tick or command wrote it, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, frame: &UiFrame) {
        match serde_json::to_string(frame) {
            Ok(payload) => {
                let _ = self.broadcaster.send(payload);
            }
            Err(err) => tracing::warn!(%err, "failed to encode frame"),
        }
    }
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub snapshot_interval: u64,
    pub snapshot_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub speed: Speed,
    pub start_paused: bool,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        snapshot_interval,
        snapshot_dir,
        host,
        port,
        speed,
        start_paused,
    } = config;

    let scenario_name = scenario.name.clone();
    let state = AppState::new(&scenario, snapshot_interval, snapshot_dir, speed, start_paused)?;

    tokio::spawn(drive_clock(state.clone()));

    let router = Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/events", get(stream_events))
        .route("/api/commands", post(submit_command))
        .route("/api/control/pause", post(pause))
        .route("/api/control/resume", post(resume))
        .route("/api/control/speed/:speed", post(set_speed))
        .route("/api/control/step/:days", post(step))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;

    tracing::info!(%addr, scenario = %scenario_name, "settlement server listening");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down settlement server");
}

enum TickRequest {
    /// One clock period: skipped while paused, days taken from the speed.
    Clock,
    /// An explicit step of the given days, paused or not.
    Step(u32),
}

/// Runs one tick on the blocking pool. The session lock is held for the
/// whole tick, snapshot write included, so commands never interleave with it.
async fn run_tick(state: &AppState, request: TickRequest) -> Result<Option<UiFrame>> {
    let session = state.session.clone();
    let frame = tokio::task::spawn_blocking(move || -> Result<Option<UiFrame>> {
        let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        let session = &mut *guard;
        let days = match request {
            TickRequest::Clock if !session.clock.is_running() => return Ok(None),
            TickRequest::Clock => session.clock.days_per_tick(),
            TickRequest::Step(days) => days,
        };
        let report = session.engine.tick(&mut session.world, days)?;
        Ok(Some(session.frame_from_report(report)))
    })
    .await??;
    if let Some(frame) = &frame {
        state.publish(frame);
    }
    Ok(frame)
}

/// Ticks the world at the clock's current pace. Pause takes effect from the
/// next period; a tick already running completes.
async fn drive_clock(state: AppState) {
    loop {
        let period = state.lock().clock.period();
        tokio::time::sleep(period).await;

        if let Err(err) = run_tick(&state, TickRequest::Clock).await {
            tracing::error!(error = ?err, "tick failed, pausing clock");
            state.lock().clock.pause();
        }
    }
}

async fn latest_state(State(state): State<AppState>) -> Json<StateEnvelope> {
    let session = state.lock();
    Json(StateEnvelope {
        scenario: session.engine.scenario_name().to_string(),
        clock: session.clock,
        snapshot: session.world.snapshot(session.engine.scenario_name()),
    })
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

async fn submit_command(State(state): State<AppState>, Json(command): Json<Command>) -> Response {
    let (result, frame): (Result<CommandOutcome, CommandError>, UiFrame) = {
        let mut guard = state.lock();
        let session = &mut *guard;
        let result = session.engine.apply(&mut session.world, command);
        let notifications = session.world.drain_notifications();
        (result, session.frame(notifications))
    };
    match result {
        Ok(outcome) => {
            state.publish(&frame);
            Json(outcome).into_response()
        }
        Err(err) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}

async fn pause(State(state): State<AppState>) -> Json<Clock> {
    let mut session = state.lock();
    session.clock.pause();
    tracing::info!("clock paused");
    Json(session.clock)
}

async fn resume(State(state): State<AppState>) -> Json<Clock> {
    let mut session = state.lock();
    session.clock.resume();
    tracing::info!("clock resumed");
    Json(session.clock)
}

async fn set_speed(State(state): State<AppState>, Path(speed): Path<String>) -> Response {
    let speed: Speed = match speed.parse() {
        Ok(speed) => speed,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, format!("{err}")),
    };
    let mut session = state.lock();
    session.clock.set_speed(speed);
    tracing::info!(%speed, "clock speed changed");
    Json(session.clock).into_response()
}

/// Runs one tick of `days` days regardless of the pause flag.
async fn step(State(state): State<AppState>, Path(days): Path<u32>) -> Response {
    if !(1..=MAX_TICK_DAYS).contains(&days) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("days must be between 1 and {MAX_TICK_DAYS}"),
        );
    }
    match run_tick(&state, TickRequest::Step(days)).await {
        Ok(Some(frame)) => Json(frame).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")),
    }
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioLoader;

    fn paused_state(snapshot_dir: &std::path::Path) -> AppState {
        let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
            .load("scenarios/river_holdings.yaml")
            .unwrap();
        AppState::new(&scenario, 1, snapshot_dir.to_path_buf(), Speed::Normal, true).unwrap()
    }

    #[tokio::test]
    async fn step_rejects_out_of_range_days() {
        let dir = tempfile::tempdir().unwrap();
        let state = paused_state(dir.path());

        for days in [0, MAX_TICK_DAYS + 1, u32::MAX] {
            let response = step(State(state.clone()), Path(days)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(state.lock().world.tick(), 0);
    }

    #[tokio::test]
    async fn step_ticks_while_paused_and_writes_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = paused_state(dir.path());
        let mut events = state.broadcaster.subscribe();

        let response = step(State(state.clone()), Path(3)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.lock().world.tick(), 1);
        assert!(!state.lock().clock.is_running());
        assert!(events.try_recv().is_ok());
        assert!(dir.path().join("river_holdings/tick_000001.json").exists());
    }

    #[tokio::test]
    async fn paused_clock_skips_its_tick() {
        let dir = tempfile::tempdir().unwrap();
        let state = paused_state(dir.path());
        let frame = run_tick(&state, TickRequest::Clock).await.unwrap();
        assert!(frame.is_none());
        assert_eq!(state.lock().world.tick(), 0);
    }
}
