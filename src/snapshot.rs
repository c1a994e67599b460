use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bracket::{Team, Tournament};
use crate::teams::{compute_team_name, make_team_id, DrawMode};
use crate::types::{REPLAY_SAFETY_LIMIT, SAVE_VERSION};

/// Flat version-2 save: setup inputs plus one decision record per match.
/// Bracket geometry is never stored; replaying the decisions rebuilds it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
  pub version: u32,
  pub saved_at: String,
  pub draw_mode: DrawMode,
  pub draw_list: Vec<String>,
  pub teams: Vec<SavedTeam>,
  pub match_decisions: BTreeMap<String, SavedDecision>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedTeam {
  pub id: String,
  pub seed: u32,
  pub members: [String; 2],
  pub name: String,
}

impl Default for SavedTeam {
  fn default() -> Self {
    SavedTeam {
      id: String::new(),
      seed: 0,
      members: [String::new(), String::new()],
      name: String::new(),
    }
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedDecision {
  pub decided: bool,
  pub decided_by_bye: bool,
  pub winner_id: Option<String>,
  pub loser_id: Option<String>,
}

pub fn make_save(tournament: &Tournament, draw_mode: DrawMode, draw_list: &[String]) -> SaveFile {
  let mut match_decisions = BTreeMap::new();
  for m in tournament.matches() {
    match_decisions.insert(
      m.match_id.clone(),
      SavedDecision {
        decided: m.decided,
        decided_by_bye: m.decided_by_bye,
        winner_id: m.winner_id.clone(),
        loser_id: m.loser_id.clone(),
      },
    );
  }
  SaveFile {
    version: SAVE_VERSION,
    saved_at: chrono::Utc::now().to_rfc3339(),
    draw_mode,
    draw_list: draw_list.to_vec(),
    teams: tournament
      .teams()
      .iter()
      .map(|t| SavedTeam {
        id: t.id.clone(),
        seed: t.seed,
        members: t.members.clone(),
        name: t.name.clone(),
      })
      .collect(),
    match_decisions,
  }
}

fn normalize_saved_teams(saved: &[SavedTeam]) -> Vec<Team> {
  saved
    .iter()
    .enumerate()
    .map(|(i, raw)| {
      let seed = if raw.seed > 0 { raw.seed } else { i as u32 + 1 };
      let id = if raw.id.is_empty() {
        make_team_id(seed)
      } else {
        raw.id.clone()
      };
      let name = if raw.name.is_empty() {
        compute_team_name(&raw.members[0], &raw.members[1])
      } else {
        raw.name.clone()
      };
      Team {
        id,
        seed,
        members: raw.members.clone(),
        name,
        wins: 0,
        losses: 0,
      }
    })
    .collect()
}

fn validate_save(save: &SaveFile, teams: &[Team]) -> Result<(), String> {
  if save.version != SAVE_VERSION {
    return Err(format!(
      "Unsupported save version {} (expected {}).",
      save.version, SAVE_VERSION
    ));
  }
  if teams.is_empty() {
    return Err("Save contains no teams.".to_string());
  }
  let known = teams.iter().map(|t| t.id.as_str()).collect::<Vec<_>>();
  for (match_id, d) in &save.match_decisions {
    if !d.decided {
      continue;
    }
    if d.decided_by_bye {
      continue;
    }
    let (Some(winner), Some(loser)) = (&d.winner_id, &d.loser_id) else {
      return Err(format!(
        "Corrupt save: decision for {match_id} is missing a winner/loser pair."
      ));
    };
    if !known.contains(&winner.as_str()) {
      return Err(format!("Corrupt save: unknown winner {winner} in {match_id}."));
    }
    if !known.contains(&loser.as_str()) {
      return Err(format!("Corrupt save: unknown loser {loser} in {match_id}."));
    }
  }
  Ok(())
}

/// Rebuilds a tournament by replaying the saved decisions against freshly
/// generated geometry. A recorded decision is applied only when its match
/// currently holds exactly the recorded winner/loser pair; everything else
/// is skipped and retried on the next pass, until a full pass applies
/// nothing. Byes are not replayed, the builder resolves them itself.
pub fn apply_save(save: &SaveFile) -> Result<Tournament, String> {
  let teams = normalize_saved_teams(&save.teams);
  validate_save(save, &teams)?;

  let mut tournament = Tournament::new(teams)?;

  let mut safety = 0;
  loop {
    safety += 1;
    if safety > REPLAY_SAFETY_LIMIT {
      tracing::warn!("save replay did not settle within the safety limit, keeping partial state");
      break;
    }
    let mut applied_any = false;

    let mut i = 0;
    while i < tournament.matches().len() {
      let candidate = {
        let m = &tournament.matches()[i];
        if m.decided {
          None
        } else {
          match save.match_decisions.get(&m.match_id) {
            Some(d) if d.decided && !d.decided_by_bye => {
              let slots = [m.slot_a.team_id.clone(), m.slot_b.team_id.clone()];
              match (&d.winner_id, &d.loser_id) {
                (Some(winner), Some(loser))
                  if slots.contains(&Some(winner.clone()))
                    && slots.contains(&Some(loser.clone())) =>
                {
                  Some((m.match_id.clone(), winner.clone()))
                }
                _ => None,
              }
            }
            _ => None,
          }
        }
      };
      i += 1;

      if let Some((match_id, winner_id)) = candidate {
        if tournament.decide(&match_id, &winner_id) {
          applied_any = true;
        }
      }
    }

    if !applied_any {
      break;
    }
  }

  Ok(tournament)
}
