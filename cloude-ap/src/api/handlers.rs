//! HTTP request handlers
//!
//! Handlers lock the engine, run one operation and answer with JSON.
//! Engine errors map to status codes in [`error_response`].

use crate::api::server::AppContext;
use crate::error::Error;
use crate::library::{Album, TrackRecord};
use crate::playback::effects::{Preset, StageValues};
use crate::playback::engine::{EngineSnapshot, LoadOutcome};
use crate::playback::queue::RepeatMode;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cloude_common::config::{EffectsSettings, PlaybackModes};
use cloude_common::events::PlaybackState;
use cloude_common::FadeCurve;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<StatusResponse>)>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BuildInfoResponse {
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    state: PlaybackState,
}

/// Result of a track-change request
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    /// `crossfading`, `swapped`, `cued`, `failed` or `none`
    outcome: &'static str,
    snapshot: EngineSnapshot,
}

/// Seek target: `seconds` (a lyric line) wins over `ratio` (the scrub bar)
#[derive(Debug, Default, Deserialize)]
pub struct SeekRequest {
    ratio: Option<f64>,
    seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SeekResponse {
    position_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumRequest {
    key: String,
    /// Library index of the track to start from
    #[serde(default)]
    start: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    tracks: Vec<TrackRecord>,
    albums: Vec<Album>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VolumeBody {
    /// 0.0-1.0
    volume: f32,
}

/// Partial effects update; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct EffectsUpdate {
    enabled: Option<bool>,
    preset: Option<String>,
    strength: Option<u8>,
    separation: Option<bool>,
    bass_db: Option<i8>,
    clarity_db: Option<i8>,
}

#[derive(Debug, Serialize)]
pub struct EffectsResponse {
    settings: EffectsSettings,
    stages: StageValues,
    presets: Vec<PresetInfo>,
}

#[derive(Debug, Serialize)]
pub struct PresetInfo {
    name: &'static str,
    label: &'static str,
}

/// Partial mode update; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct ModesUpdate {
    crossfade: Option<bool>,
    gapless: Option<bool>,
    smart_play: Option<bool>,
    crossfade_seconds: Option<f64>,
    fade_curve: Option<FadeCurve>,
    shuffle: Option<bool>,
    repeat: Option<RepeatMode>,
    auto_lyrics: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ModesResponse {
    modes: PlaybackModes,
    shuffle: bool,
    repeat: RepeatMode,
    auto_lyrics: bool,
}

/// Map an engine error to a status code and message
pub fn error_response(e: Error) -> (StatusCode, Json<StatusResponse>) {
    let status = match &e {
        Error::TransitionInFlight => StatusCode::CONFLICT,
        Error::Queue(_) => StatusCode::NOT_FOUND,
        Error::Common(cloude_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Request failed: {}", e);
    }
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

fn outcome_name(outcome: Option<LoadOutcome>) -> &'static str {
    match outcome {
        Some(LoadOutcome::Crossfading(_)) => "crossfading",
        Some(LoadOutcome::Swapped) => "swapped",
        Some(LoadOutcome::Cued) => "cued",
        Some(LoadOutcome::Failed) => "failed",
        None => "none",
    }
}

// ============================================================================
// Health Endpoints
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "cloude-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /build_info
pub async fn build_info() -> Json<BuildInfoResponse> {
    Json(BuildInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

// ============================================================================
// Transport Endpoints
// ============================================================================

/// GET /playback/state
pub async fn get_state(State(ctx): State<AppContext>) -> Json<EngineSnapshot> {
    let engine = ctx.engine.lock().await;
    Json(engine.snapshot())
}

/// POST /playback/toggle
pub async fn toggle(State(ctx): State<AppContext>) -> ApiResult<ToggleResponse> {
    let mut engine = ctx.engine.lock().await;
    let state = engine.toggle_play().map_err(error_response)?;
    info!("Toggle -> {}", state);
    Ok(Json(ToggleResponse { state }))
}

/// POST /playback/next
pub async fn next(State(ctx): State<AppContext>) -> ApiResult<TransitionResponse> {
    let mut engine = ctx.engine.lock().await;
    let outcome = engine.next_song().map_err(error_response)?;
    Ok(Json(TransitionResponse {
        outcome: outcome_name(outcome),
        snapshot: engine.snapshot(),
    }))
}

/// POST /playback/previous
pub async fn previous(State(ctx): State<AppContext>) -> ApiResult<TransitionResponse> {
    let mut engine = ctx.engine.lock().await;
    let outcome = engine.prev_song().map_err(error_response)?;
    Ok(Json(TransitionResponse {
        outcome: outcome_name(outcome),
        snapshot: engine.snapshot(),
    }))
}

/// POST /playback/seek
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> ApiResult<SeekResponse> {
    let mut engine = ctx.engine.lock().await;
    let position_seconds = match (req.seconds, req.ratio) {
        (Some(seconds), _) => engine.seek_seconds(seconds),
        (None, Some(ratio)) => engine.seek_ratio(ratio),
        (None, None) => {
            return Err(error_response(
                cloude_common::Error::InvalidInput("seek needs ratio or seconds".to_string())
                    .into(),
            ))
        }
    };
    Ok(Json(SeekResponse { position_seconds }))
}

/// POST /playback/queue/:index - play a queue entry
pub async fn play_queue_entry(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> ApiResult<TransitionResponse> {
    let mut engine = ctx.engine.lock().await;
    let outcome = engine.load_from_queue(index, true).map_err(error_response)?;
    Ok(Json(TransitionResponse {
        outcome: outcome_name(Some(outcome)),
        snapshot: engine.snapshot(),
    }))
}

// ============================================================================
// Library Endpoints
// ============================================================================

/// GET /library
pub async fn get_library(State(ctx): State<AppContext>) -> Json<LibraryResponse> {
    let engine = ctx.engine.lock().await;
    let library = engine.library();
    Json(LibraryResponse {
        tracks: library.tracks().to_vec(),
        albums: library.albums().to_vec(),
    })
}

/// POST /library/:index/play
pub async fn play_library_entry(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> ApiResult<TransitionResponse> {
    let mut engine = ctx.engine.lock().await;
    let outcome = engine
        .start_from_library_index(index)
        .map_err(error_response)?;
    Ok(Json(TransitionResponse {
        outcome: outcome_name(Some(outcome)),
        snapshot: engine.snapshot(),
    }))
}

/// POST /albums/play
pub async fn play_album(
    State(ctx): State<AppContext>,
    Json(req): Json<AlbumRequest>,
) -> ApiResult<TransitionResponse> {
    let mut engine = ctx.engine.lock().await;
    let outcome = engine
        .play_album(&req.key, req.start)
        .map_err(error_response)?;
    Ok(Json(TransitionResponse {
        outcome: outcome_name(Some(outcome)),
        snapshot: engine.snapshot(),
    }))
}

// ============================================================================
// Volume and Effects Endpoints
// ============================================================================

/// GET /audio/volume
pub async fn get_volume(State(ctx): State<AppContext>) -> Json<VolumeBody> {
    let engine = ctx.engine.lock().await;
    Json(VolumeBody {
        volume: engine.settings().volume,
    })
}

/// POST /audio/volume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeBody>,
) -> ApiResult<VolumeBody> {
    let mut engine = ctx.engine.lock().await;
    let volume = engine.set_volume(req.volume).map_err(error_response)?;
    Ok(Json(VolumeBody { volume }))
}

fn effects_response(engine: &crate::playback::engine::PlayerEngine) -> EffectsResponse {
    EffectsResponse {
        settings: engine.effects_settings().clone(),
        stages: engine.stage_values(),
        presets: Preset::all()
            .iter()
            .map(|p| PresetInfo {
                name: p.name(),
                label: p.label(),
            })
            .collect(),
    }
}

/// GET /effects
pub async fn get_effects(State(ctx): State<AppContext>) -> Json<EffectsResponse> {
    let engine = ctx.engine.lock().await;
    Json(effects_response(&engine))
}

/// POST /effects
pub async fn update_effects(
    State(ctx): State<AppContext>,
    Json(req): Json<EffectsUpdate>,
) -> ApiResult<EffectsResponse> {
    let mut engine = ctx.engine.lock().await;
    if let Some(preset) = &req.preset {
        engine.set_preset(preset).map_err(error_response)?;
    }
    if let Some(strength) = req.strength {
        engine.set_strength(strength).map_err(error_response)?;
    }
    if let Some(separation) = req.separation {
        engine.set_separation(separation).map_err(error_response)?;
    }
    if let Some(bass) = req.bass_db {
        engine.set_bass(bass).map_err(error_response)?;
    }
    if let Some(clarity) = req.clarity_db {
        engine.set_clarity(clarity).map_err(error_response)?;
    }
    if let Some(enabled) = req.enabled {
        engine.set_effects_enabled(enabled).map_err(error_response)?;
    }
    Ok(Json(effects_response(&engine)))
}

/// POST /modes
pub async fn update_modes(
    State(ctx): State<AppContext>,
    Json(req): Json<ModesUpdate>,
) -> ApiResult<ModesResponse> {
    let mut engine = ctx.engine.lock().await;
    if let Some(crossfade) = req.crossfade {
        engine.set_crossfade(crossfade);
    }
    if let Some(gapless) = req.gapless {
        engine.set_gapless(gapless);
    }
    if let Some(smart_play) = req.smart_play {
        engine.set_smart_play(smart_play);
    }
    if let Some(seconds) = req.crossfade_seconds {
        engine.set_crossfade_seconds(seconds).map_err(error_response)?;
    }
    if let Some(curve) = req.fade_curve {
        engine.set_fade_curve(curve);
    }
    if let Some(shuffle) = req.shuffle {
        if engine.queue().shuffle() != shuffle {
            engine.toggle_shuffle();
        }
    }
    if let Some(repeat) = req.repeat {
        engine.set_repeat(repeat);
    }
    if let Some(auto_lyrics) = req.auto_lyrics {
        engine.set_auto_lyrics(auto_lyrics);
    }
    Ok(Json(ModesResponse {
        modes: engine.playback_modes().clone(),
        shuffle: engine.queue().shuffle(),
        repeat: engine.queue().repeat(),
        auto_lyrics: engine.settings().auto_lyrics,
    }))
}
