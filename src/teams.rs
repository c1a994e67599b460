use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bracket::Team;
use crate::types::{MAX_TEAMS, MIN_TEAMS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawMode {
  #[serde(rename = "team")]
  Team,
  #[serde(rename = "snake")]
  Snake,
}

impl DrawMode {
  pub fn parse(raw: &str) -> DrawMode {
    if raw.trim() == "snake" {
      DrawMode::Snake
    } else {
      DrawMode::Team
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      DrawMode::Team => "team",
      DrawMode::Snake => "snake",
    }
  }
}

impl Default for DrawMode {
  fn default() -> Self {
    DrawMode::Team
  }
}

pub fn normalize_lines(text: &str) -> Vec<String> {
  text
    .lines()
    .map(|line| line.trim())
    .filter(|line| !line.is_empty())
    .map(|line| line.to_string())
    .collect()
}

fn member_display(name: &str) -> &str {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    "TBD"
  } else {
    trimmed
  }
}

pub fn compute_team_name(m1: &str, m2: &str) -> String {
  format!("{} / {}", member_display(m1), member_display(m2))
}

pub fn make_team_id(seed: u32) -> String {
  format!("t{seed:02}")
}

/// Draws teams of two from a flat player list. In team mode consecutive
/// players pair up; in snake mode the first pass fills every team's first
/// slot, the second pass the second slot. An odd list leaves the last team
/// with a TBD partner.
pub fn generate_teams_from_draw(draw_list: &[String], mode: DrawMode) -> Result<Vec<Team>, String> {
  let players = draw_list.to_vec();
  let team_count = (players.len() + 1) / 2;

  if team_count < MIN_TEAMS {
    return Err(format!(
      "Need at least {} players ({} teams).",
      MIN_TEAMS * 2,
      MIN_TEAMS
    ));
  }
  if team_count > MAX_TEAMS {
    return Err(format!(
      "Max is {} teams ({} players).",
      MAX_TEAMS,
      MAX_TEAMS * 2
    ));
  }

  let take = |idx: usize| players.get(idx).cloned().unwrap_or_default();
  let mut slots = vec![[String::new(), String::new()]; team_count];
  match mode {
    DrawMode::Team => {
      for (t, slot) in slots.iter_mut().enumerate() {
        slot[0] = take(t * 2);
        slot[1] = take(t * 2 + 1);
      }
    }
    DrawMode::Snake => {
      for (t, slot) in slots.iter_mut().enumerate() {
        slot[0] = take(t);
      }
      for (t, slot) in slots.iter_mut().enumerate() {
        slot[1] = take(team_count + t);
      }
    }
  }

  let teams = slots
    .into_iter()
    .enumerate()
    .map(|(i, [m1, m2])| {
      let seed = i as u32 + 1;
      Team {
        id: make_team_id(seed),
        seed,
        name: compute_team_name(&m1, &m2),
        members: [m1, m2],
        wins: 0,
        losses: 0,
      }
    })
    .collect();
  Ok(teams)
}

// ── Dataset preload ────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DatasetFile {
  draw_mode: Option<String>,
  draw_list: Option<Vec<String>>,
  teams: Option<Vec<DatasetTeam>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DatasetTeam {
  id: Option<String>,
  seed: Option<u32>,
  members: Option<Vec<String>>,
  name: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
  pub draw_mode: DrawMode,
  pub draw_list: Vec<String>,
  pub teams: Vec<Team>,
}

pub fn parse_dataset(data: &str) -> Result<Dataset, String> {
  let file = serde_json::from_str::<DatasetFile>(data).map_err(|e| format!("parse dataset: {e}"))?;

  let mut teams = Vec::new();
  for (i, raw) in file.teams.unwrap_or_default().into_iter().enumerate() {
    let seed = raw.seed.unwrap_or(i as u32 + 1);
    let members_raw = raw.members.unwrap_or_default();
    let m1 = members_raw.first().cloned().unwrap_or_default();
    let m2 = members_raw.get(1).cloned().unwrap_or_default();
    let id = raw.id.unwrap_or_else(|| make_team_id(seed));
    let name = raw.name.unwrap_or_else(|| compute_team_name(&m1, &m2));
    teams.push(Team {
      id,
      seed,
      members: [m1, m2],
      name,
      wins: 0,
      losses: 0,
    });
  }
  teams.sort_by_key(|t| t.seed);

  Ok(Dataset {
    draw_mode: DrawMode::parse(file.draw_mode.as_deref().unwrap_or("team")),
    draw_list: file.draw_list.unwrap_or_default(),
    teams,
  })
}

pub fn load_dataset(path: &Path) -> Result<Dataset, String> {
  let data =
    fs::read_to_string(path).map_err(|e| format!("read dataset {}: {e}", path.display()))?;
  parse_dataset(&data)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn players(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("P{i}")).collect()
  }

  #[test]
  fn team_mode_pairs_consecutive_players() {
    let teams = generate_teams_from_draw(&players(8), DrawMode::Team).unwrap();
    assert_eq!(teams.len(), 4);
    assert_eq!(teams[0].id, "t01");
    assert_eq!(teams[0].members, ["P1".to_string(), "P2".to_string()]);
    assert_eq!(teams[0].name, "P1 / P2");
    assert_eq!(teams[3].members, ["P7".to_string(), "P8".to_string()]);
    assert_eq!(teams[3].seed, 4);
  }

  #[test]
  fn snake_mode_fills_first_slots_then_second() {
    let teams = generate_teams_from_draw(&players(8), DrawMode::Snake).unwrap();
    assert_eq!(teams[0].members, ["P1".to_string(), "P5".to_string()]);
    assert_eq!(teams[1].members, ["P2".to_string(), "P6".to_string()]);
    assert_eq!(teams[3].members, ["P4".to_string(), "P8".to_string()]);
  }

  #[test]
  fn odd_player_count_leaves_tbd_partner() {
    let teams = generate_teams_from_draw(&players(9), DrawMode::Team).unwrap();
    assert_eq!(teams.len(), 5);
    assert_eq!(teams[4].members[1], "");
    assert_eq!(teams[4].name, "P9 / TBD");
  }

  #[test]
  fn rejects_too_few_and_too_many_players() {
    let err = generate_teams_from_draw(&players(7), DrawMode::Team).unwrap_err();
    assert!(err.contains("at least 8 players"), "{err}");
    let err = generate_teams_from_draw(&players(41), DrawMode::Team).unwrap_err();
    assert!(err.contains("Max is 20 teams"), "{err}");
  }

  #[test]
  fn normalize_lines_trims_and_drops_blanks() {
    let lines = normalize_lines("  Alice \n\n\r\nBob\n   \n");
    assert_eq!(lines, vec!["Alice".to_string(), "Bob".to_string()]);
  }

  #[test]
  fn dataset_fills_missing_fields() {
    let data = r#"{
      "drawMode": "snake",
      "drawList": ["A", "B"],
      "teams": [
        { "members": ["A", "B"] },
        { "seed": 2, "id": "custom", "members": ["C"], "name": "The Cs" }
      ]
    }"#;
    let dataset = parse_dataset(data).unwrap();
    assert_eq!(dataset.draw_mode, DrawMode::Snake);
    assert_eq!(dataset.draw_list.len(), 2);
    assert_eq!(dataset.teams[0].id, "t01");
    assert_eq!(dataset.teams[0].name, "A / B");
    assert_eq!(dataset.teams[1].id, "custom");
    assert_eq!(dataset.teams[1].name, "The Cs");
    assert_eq!(dataset.teams[1].members[1], "");
  }
}
