use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::bracket::{BracketState, Team, Tournament};
use crate::config;
use crate::snapshot::{apply_save, make_save, SaveFile};
use crate::teams::{generate_teams_from_draw, load_dataset, normalize_lines, DrawMode};
use crate::types::{AppConfig, DecideResponse, SharedBracket};

/// Everything behind the server: setup inputs, the generated teams, and the
/// running tournament (if one has started).
pub struct BracketStore {
    pub draw_mode: DrawMode,
    pub draw_list: Vec<String>,
    pub teams: Vec<Team>,
    pub tournament: Option<Tournament>,
    pub autosave_enabled: bool,
    pub autosave_path: PathBuf,
}

impl BracketStore {
    pub fn from_config(config: &AppConfig) -> Self {
        BracketStore {
            draw_mode: DrawMode::Team,
            draw_list: Vec::new(),
            teams: Vec::new(),
            tournament: None,
            autosave_enabled: config.autosave,
            autosave_path: config::autosave_path(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub draw_mode: String,
    pub draw_list: Vec<String>,
    pub team_count: usize,
    pub started: bool,
    pub bracket: Option<BracketState>,
}

fn payload(store: &BracketStore) -> StatePayload {
    StatePayload {
        draw_mode: store.draw_mode.as_str().to_string(),
        draw_list: store.draw_list.clone(),
        team_count: store.teams.len(),
        started: store.tournament.is_some(),
        bracket: store.tournament.as_ref().map(|t| t.state()),
    }
}

fn with_store<F, R>(state: &SharedBracket, f: F) -> Result<R, String>
where
    F: FnOnce(&mut BracketStore) -> Result<R, String>,
{
    let mut guard = state
        .lock()
        .map_err(|_| "Bracket state lock poisoned.".to_string())?;
    f(&mut guard)
}

/// Autosave failures never fail the command that triggered them.
fn autosave(store: &BracketStore) {
    if !store.autosave_enabled {
        return;
    }
    let Some(tournament) = &store.tournament else {
        return;
    };
    let save = make_save(tournament, store.draw_mode, &store.draw_list);
    let result = serde_json::to_string_pretty(&save)
        .map_err(|e| e.to_string())
        .and_then(|data| {
            fs::write(&store.autosave_path, data)
                .map_err(|e| format!("write {}: {e}", store.autosave_path.display()))
        });
    if let Err(err) = result {
        tracing::warn!(%err, "autosave failed");
    }
}

fn clear_autosave(store: &BracketStore) {
    if store.autosave_path.is_file() {
        let _ = fs::remove_file(&store.autosave_path);
    }
}

pub fn get_state(state: &SharedBracket) -> Result<StatePayload, String> {
    with_store(state, |store| Ok(payload(store)))
}

pub fn start_tournament(
    state: &SharedBracket,
    draw_mode: Option<String>,
    draw_list: Option<Vec<String>>,
) -> Result<StatePayload, String> {
    with_store(state, |store| {
        let mode = match draw_mode {
            Some(raw) => DrawMode::parse(&raw),
            None => store.draw_mode,
        };
        let list = draw_list.map(|lines| normalize_lines(&lines.join("\n")));
        // Generate and validate before touching the store, so a bad draw
        // list leaves the previous setup intact.
        let teams = match &list {
            Some(list) => generate_teams_from_draw(list, mode)?,
            None if store.teams.is_empty() => generate_teams_from_draw(&store.draw_list, mode)?,
            None => store.teams.clone(),
        };
        let tournament = Tournament::new(teams.clone())?;
        store.draw_mode = mode;
        if let Some(list) = list {
            store.draw_list = list;
        }
        store.teams = teams;
        store.tournament = Some(tournament);
        tracing::info!(teams = store.teams.len(), "tournament started");
        autosave(store);
        Ok(payload(store))
    })
}

pub fn decide_match(
    state: &SharedBracket,
    match_id: &str,
    winner_id: &str,
) -> Result<DecideResponse, String> {
    with_store(state, |store| {
        let Some(tournament) = store.tournament.as_mut() else {
            return Err("No tournament in progress.".to_string());
        };
        let applied = tournament.decide(match_id, winner_id);
        let champion_id = tournament.champion_id().map(|id| id.to_string());
        if applied {
            autosave(store);
        } else {
            tracing::info!(match_id, winner_id, "decision ignored");
        }
        Ok(DecideResponse {
            applied,
            champion_id,
        })
    })
}

/// Wipes the bracket but keeps the generated teams, back to a fresh start
/// round.
pub fn restart_brackets(state: &SharedBracket) -> Result<StatePayload, String> {
    with_store(state, |store| {
        if store.teams.is_empty() {
            return Err("No teams to restart with.".to_string());
        }
        store.tournament = Some(Tournament::new(store.teams.clone())?);
        tracing::info!("brackets restarted");
        autosave(store);
        Ok(payload(store))
    })
}

pub fn export_save(state: &SharedBracket) -> Result<SaveFile, String> {
    with_store(state, |store| {
        let Some(tournament) = &store.tournament else {
            return Err("No tournament in progress.".to_string());
        };
        Ok(make_save(tournament, store.draw_mode, &store.draw_list))
    })
}

pub fn load_save(state: &SharedBracket, save: SaveFile) -> Result<StatePayload, String> {
    with_store(state, |store| {
        let tournament = apply_save(&save)?;
        store.draw_mode = save.draw_mode;
        store.draw_list = save.draw_list.clone();
        store.teams = tournament.teams().to_vec();
        store.tournament = Some(tournament);
        tracing::info!(teams = store.teams.len(), "save loaded");
        autosave(store);
        Ok(payload(store))
    })
}

pub fn hard_reset(state: &SharedBracket) -> Result<StatePayload, String> {
    with_store(state, |store| {
        clear_autosave(store);
        store.draw_mode = DrawMode::Team;
        store.draw_list = Vec::new();
        store.teams = Vec::new();
        store.tournament = None;
        tracing::info!("hard reset");
        Ok(payload(store))
    })
}

/// Boot-time restore: autosave first, then the configured dataset. Returns
/// what got loaded so the caller can log it.
pub fn restore_on_boot(store: &mut BracketStore, config: &AppConfig) -> &'static str {
    if store.autosave_enabled && store.autosave_path.is_file() {
        match fs::read_to_string(&store.autosave_path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<SaveFile>(&data).map_err(|e| e.to_string()))
            .and_then(|save| apply_save(&save).map(|t| (save, t)))
        {
            Ok((save, tournament)) => {
                store.draw_mode = save.draw_mode;
                store.draw_list = save.draw_list;
                store.teams = tournament.teams().to_vec();
                store.tournament = Some(tournament);
                return "autosave";
            }
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable autosave");
            }
        }
    }

    let dataset_path = config::resolve_repo_path(&config.dataset_path);
    if dataset_path.is_file() {
        match load_dataset(&dataset_path) {
            Ok(dataset) => {
                store.draw_mode = dataset.draw_mode;
                store.draw_list = dataset.draw_list;
                store.teams = dataset.teams;
                return "dataset";
            }
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable dataset");
            }
        }
    }

    "nothing"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn make_test_state() -> SharedBracket {
        let store = BracketStore {
            draw_mode: DrawMode::Team,
            draw_list: Vec::new(),
            teams: Vec::new(),
            tournament: None,
            autosave_enabled: false,
            autosave_path: PathBuf::from("unused-autosave.json"),
        };
        Arc::new(Mutex::new(store))
    }

    fn players(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("P{i}")).collect()
    }

    #[test]
    fn start_generates_teams_and_a_start_round() {
        let state = make_test_state();
        let payload = start_tournament(&state, Some("team".to_string()), Some(players(8))).unwrap();
        assert!(payload.started);
        assert_eq!(payload.team_count, 4);
        let bracket = payload.bracket.unwrap();
        assert_eq!(bracket.start.unwrap().matches.len(), 2);
        assert!(bracket.champion_id.is_none());
    }

    #[test]
    fn start_rejects_short_draw_lists() {
        let state = make_test_state();
        let err = start_tournament(&state, None, Some(players(5))).unwrap_err();
        assert!(err.contains("at least 8 players"), "{err}");
        assert!(!get_state(&state).unwrap().started);
    }

    #[test]
    fn start_drops_blank_draw_lines() {
        let state = make_test_state();
        let mut lines = players(8);
        lines.insert(3, "   ".to_string());
        lines.push(String::new());
        let payload = start_tournament(&state, None, Some(lines)).unwrap();
        assert_eq!(payload.draw_list, players(8));
        assert_eq!(payload.team_count, 4);
    }

    #[test]
    fn failed_start_leaves_previous_setup_intact() {
        let state = make_test_state();
        start_tournament(&state, Some("team".to_string()), Some(players(8))).unwrap();
        let err = start_tournament(&state, Some("snake".to_string()), Some(players(5))).unwrap_err();
        assert!(err.contains("at least 8 players"), "{err}");
        let payload = get_state(&state).unwrap();
        assert_eq!(payload.draw_mode, "team");
        assert_eq!(payload.draw_list, players(8));
        assert_eq!(payload.team_count, 4);
        assert!(payload.started);
    }

    #[test]
    fn decide_reports_ignored_decisions() {
        let state = make_test_state();
        start_tournament(&state, None, Some(players(8))).unwrap();
        let res = decide_match(&state, "START-R1-M1", "t01").unwrap();
        assert!(res.applied);
        let res = decide_match(&state, "START-R1-M1", "t02").unwrap();
        assert!(!res.applied);
        let err = decide_match(&make_test_state(), "START-R1-M1", "t01").unwrap_err();
        assert!(err.contains("No tournament"), "{err}");
    }

    #[test]
    fn restart_keeps_teams_and_clears_decisions() {
        let state = make_test_state();
        start_tournament(&state, None, Some(players(8))).unwrap();
        decide_match(&state, "START-R1-M1", "t01").unwrap();
        let payload = restart_brackets(&state).unwrap();
        assert_eq!(payload.team_count, 4);
        let bracket = payload.bracket.unwrap();
        let start = bracket.start.unwrap();
        assert!(start.matches.iter().all(|m| !m.decided));
    }

    #[test]
    fn export_and_load_round_trip() {
        let state = make_test_state();
        start_tournament(&state, None, Some(players(10))).unwrap();
        decide_match(&state, "START-R1-M1", "t01").unwrap();
        decide_match(&state, "START-R1-M2", "t03").unwrap();
        let save = export_save(&state).unwrap();

        let other = make_test_state();
        let payload = load_save(&other, save).unwrap();
        assert_eq!(payload.team_count, 5);
        let bracket = payload.bracket.unwrap();
        assert_eq!(bracket.winners.len(), 1);
    }

    #[test]
    fn hard_reset_clears_everything() {
        let state = make_test_state();
        start_tournament(&state, None, Some(players(8))).unwrap();
        let payload = hard_reset(&state).unwrap();
        assert!(!payload.started);
        assert_eq!(payload.team_count, 0);
        assert!(payload.draw_list.is_empty());
    }
}
