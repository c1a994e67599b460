use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::commands::BracketStore;

// ── Constants ──────────────────────────────────────────────────────────

pub const MIN_TEAMS: usize = 4;
pub const MAX_TEAMS: usize = 20;
pub const SAVE_VERSION: u32 = 2;
pub const PROGRESS_SAFETY_LIMIT: u32 = 1000;
pub const REPLAY_SAFETY_LIMIT: u32 = 5000;

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedBracket = Arc<Mutex<BracketStore>>;

// ── Request payloads ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    pub match_id: String,
    pub winner_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub draw_mode: Option<String>,
    pub draw_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideResponse {
    pub applied: bool,
    pub champion_id: Option<String>,
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub listen_addr: String,
    pub viewer_dir: String,
    pub dataset_path: String,
    pub autosave: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8736".to_string(),
            viewer_dir: "viewer".to_string(),
            dataset_path: "data/dataset.json".to_string(),
            autosave: true,
        }
    }
}
