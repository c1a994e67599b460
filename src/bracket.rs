use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::PROGRESS_SAFETY_LIMIT;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketKind {
  #[serde(rename = "START")]
  Start,
  #[serde(rename = "WB")]
  Winners,
  #[serde(rename = "LB")]
  Losers,
  #[serde(rename = "FINAL")]
  Final,
  #[serde(rename = "FINAL_RESET")]
  FinalReset,
}

impl BracketKind {
  fn id_prefix(self) -> &'static str {
    match self {
      BracketKind::Start => "START",
      BracketKind::Winners => "WB",
      BracketKind::Losers => "LB",
      BracketKind::Final | BracketKind::FinalReset => "FINALS",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundOrdering {
  BySeed,
  PreserveOrder,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
  pub id: String,
  pub seed: u32,
  pub members: [String; 2],
  pub name: String,
  #[serde(default)]
  pub wins: u32,
  #[serde(default)]
  pub losses: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
  pub team_id: Option<String>,
  pub from_text: String,
}

impl Slot {
  fn team(id: &str, from_text: String) -> Slot {
    Slot {
      team_id: Some(id.to_string()),
      from_text,
    }
  }

  fn bye() -> Slot {
    Slot {
      team_id: None,
      from_text: "BYE".to_string(),
    }
  }

  pub fn is_bye(&self) -> bool {
    self.team_id.is_none() && self.from_text == "BYE"
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketMatch {
  pub match_id: String,
  pub number: u32,
  pub bracket: BracketKind,
  pub round_index: u32,
  pub slot_a: Slot,
  pub slot_b: Slot,
  pub decided: bool,
  pub decided_by_bye: bool,
  pub winner_id: Option<String>,
  pub loser_id: Option<String>,
}

impl BracketMatch {
  pub fn has_team(&self, team_id: &str) -> bool {
    self.slot_a.team_id.as_deref() == Some(team_id)
      || self.slot_b.team_id.as_deref() == Some(team_id)
  }

  /// A match accepts a manual decision only while both slots hold real teams.
  pub fn decidable(&self) -> bool {
    !self.decided && self.slot_a.team_id.is_some() && self.slot_b.team_id.is_some()
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
  pub title: String,
  pub bracket: BracketKind,
  pub round_index: u32,
  pub match_ids: Vec<String>,
}

/// Full double-elimination bracket: team registry, every match ever created
/// (in creation order), the round lists per lane, and the champion once one
/// is decided. Geometry is built lazily as decisions come in; matches are
/// never removed.
#[derive(Clone, Debug)]
pub struct Tournament {
  teams: Vec<Team>,
  team_index: HashMap<String, usize>,
  matches: Vec<BracketMatch>,
  match_index: HashMap<String, usize>,
  start: Option<Round>,
  wb: Vec<Round>,
  lb: Vec<Round>,
  finals: Vec<Round>,
  next_match_number: u32,
  champion_id: Option<String>,
}

impl Tournament {
  pub fn new(teams: Vec<Team>) -> Result<Tournament, String> {
    if teams.is_empty() {
      return Err("Cannot start a tournament with no teams.".to_string());
    }
    let mut teams = teams;
    for team in &mut teams {
      team.wins = 0;
      team.losses = 0;
    }
    teams.sort_by_key(|t| t.seed);

    let mut seen_ids = HashSet::new();
    let mut seen_seeds = HashSet::new();
    for team in &teams {
      if !seen_ids.insert(team.id.clone()) {
        return Err(format!("Duplicate team id: {}.", team.id));
      }
      if !seen_seeds.insert(team.seed) {
        return Err(format!("Duplicate seed: {}.", team.seed));
      }
    }

    let team_index = teams
      .iter()
      .enumerate()
      .map(|(idx, t)| (t.id.clone(), idx))
      .collect::<HashMap<_, _>>();

    let mut tournament = Tournament {
      teams,
      team_index,
      matches: Vec::new(),
      match_index: HashMap::new(),
      start: None,
      wb: Vec::new(),
      lb: Vec::new(),
      finals: Vec::new(),
      next_match_number: 1,
      champion_id: None,
    };

    let entrants = tournament.teams.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
    let start = tournament.build_round(
      BracketKind::Start,
      1,
      "Start".to_string(),
      entrants,
      RoundOrdering::BySeed,
      "Seeded",
    );
    tournament.start = Some(start);
    tournament.recompute_stats();
    tournament.progress();
    Ok(tournament)
  }

  pub fn teams(&self) -> &[Team] {
    &self.teams
  }

  pub fn team_by_id(&self, team_id: &str) -> Option<&Team> {
    self.team_index.get(team_id).map(|idx| &self.teams[*idx])
  }

  pub fn matches(&self) -> &[BracketMatch] {
    &self.matches
  }

  pub fn match_by_id(&self, match_id: &str) -> Option<&BracketMatch> {
    self.match_index.get(match_id).map(|idx| &self.matches[*idx])
  }

  pub fn champion_id(&self) -> Option<&str> {
    self.champion_id.as_deref()
  }

  /// Lowest-numbered undecided match, the natural "play this next" pick.
  pub fn recommended_match_id(&self) -> Option<String> {
    self
      .matches
      .iter()
      .find(|m| !m.decided)
      .map(|m| m.match_id.clone())
  }

  /// Applies a manual decision. Returns false (and changes nothing) when the
  /// match is unknown, already decided, missing a real team in either slot,
  /// or the winner is not one of its entrants.
  pub fn decide(&mut self, match_id: &str, winner_id: &str) -> bool {
    if self.champion_id.is_some() {
      return false;
    }
    let Some(index) = self.match_index.get(match_id).copied() else {
      return false;
    };
    let loser_id = {
      let m = &self.matches[index];
      if !m.decidable() {
        return false;
      }
      let a = m.slot_a.team_id.clone();
      let b = m.slot_b.team_id.clone();
      if a.as_deref() == Some(winner_id) {
        b
      } else if b.as_deref() == Some(winner_id) {
        a
      } else {
        return false;
      }
    };

    let m = &mut self.matches[index];
    m.decided = true;
    m.decided_by_bye = false;
    m.winner_id = Some(winner_id.to_string());
    m.loser_id = loser_id;
    tracing::info!(match_id, winner_id, "match decided");

    self.recompute_stats();
    self.progress();
    true
  }

  /// Rebuilds every team's tally from the decided-match history. Byes carry
  /// a winner but credit no win and charge no loss.
  fn recompute_stats(&mut self) {
    for team in &mut self.teams {
      team.wins = 0;
      team.losses = 0;
    }
    for idx in 0..self.matches.len() {
      let (winner, loser) = {
        let m = &self.matches[idx];
        if !m.decided || m.decided_by_bye {
          continue;
        }
        (m.winner_id.clone(), m.loser_id.clone())
      };
      if let Some(winner_idx) = winner.and_then(|id| self.team_index.get(&id).copied()) {
        self.teams[winner_idx].wins += 1;
      }
      if let Some(loser_idx) = loser.and_then(|id| self.team_index.get(&id).copied()) {
        self.teams[loser_idx].losses += 1;
      }
    }
  }

  fn alive_team_ids(&self) -> Vec<String> {
    self
      .teams
      .iter()
      .filter(|t| t.losses < 2)
      .map(|t| t.id.clone())
      .collect()
  }

  /// Runs every progression rule to a fixed point. Each rule reports whether
  /// it changed anything; the loop is bounded so a bug cannot spin forever.
  fn progress(&mut self) {
    let mut safety = 0;
    loop {
      safety += 1;
      if safety > PROGRESS_SAFETY_LIMIT {
        tracing::warn!("progression did not settle within the safety limit");
        break;
      }
      let mut changed = false;
      changed |= self.build_from_start();
      changed |= self.try_next_wb_round();
      changed |= self.try_next_lb_round();
      changed |= self.try_build_finals();
      changed |= self.try_finals_reset_or_champion();
      changed |= self.try_survivor_champion();
      if !changed {
        break;
      }
    }
  }

  fn round_is_complete(&self, round: &Round) -> bool {
    round
      .match_ids
      .iter()
      .all(|id| self.match_by_id(id).map(|m| m.decided).unwrap_or(false))
  }

  fn start_is_complete(&self) -> bool {
    match &self.start {
      Some(round) => self.round_is_complete(round),
      None => false,
    }
  }

  fn team_is_in_undecided_match(&self, team_id: &str) -> bool {
    self.matches.iter().any(|m| !m.decided && m.has_team(team_id))
  }

  fn bye_winners_of(&self, round: &Round) -> Vec<String> {
    let mut out = Vec::new();
    for id in &round.match_ids {
      if let Some(m) = self.match_by_id(id) {
        if m.decided && m.decided_by_bye {
          if let Some(winner) = &m.winner_id {
            out.push(winner.clone());
          }
        }
      }
    }
    out
  }

  /// Latest decided match this team took part in, as display provenance.
  fn provenance_for(&self, team_id: &str) -> Option<String> {
    let mut latest = None;
    for m in &self.matches {
      if !m.decided {
        continue;
      }
      if m.winner_id.as_deref() == Some(team_id) {
        latest = Some(format!("W of M{}", m.number));
      } else if m.loser_id.as_deref() == Some(team_id) {
        latest = Some(format!("L of M{}", m.number));
      }
    }
    latest
  }

  fn push_match(
    &mut self,
    bracket: BracketKind,
    round_index: u32,
    local_index: u32,
    slot_a: Slot,
    slot_b: Slot,
  ) -> String {
    let match_id = format!("{}-R{}-M{}", bracket.id_prefix(), round_index, local_index);
    let number = self.next_match_number;
    self.next_match_number += 1;
    let m = BracketMatch {
      match_id: match_id.clone(),
      number,
      bracket,
      round_index,
      slot_a,
      slot_b,
      decided: false,
      decided_by_bye: false,
      winner_id: None,
      loser_id: None,
    };
    self.matches.push(m);
    self.match_index.insert(match_id.clone(), self.matches.len() - 1);
    match_id
  }

  fn decide_match_by_bye(&mut self, match_id: &str) {
    let Some(index) = self.match_index.get(match_id).copied() else {
      return;
    };
    let m = &mut self.matches[index];
    let Some(winner) = m.slot_a.team_id.clone() else {
      return;
    };
    m.decided = true;
    m.decided_by_bye = true;
    m.winner_id = Some(winner);
    m.loser_id = None;
  }

  /// Builds one round from an entrant pool. Odd pools get exactly one bye:
  /// the weakest seed under BySeed, the last entrant under PreserveOrder.
  /// Pair matches are numbered first, the bye match last, and the bye is
  /// resolved on the spot.
  fn build_round(
    &mut self,
    bracket: BracketKind,
    round_index: u32,
    title: String,
    entrants: Vec<String>,
    ordering: RoundOrdering,
    default_from: &str,
  ) -> Round {
    let mut working = match ordering {
      RoundOrdering::BySeed => self.sort_team_ids_by_seed(entrants),
      RoundOrdering::PreserveOrder => entrants,
    };

    let bye_team_id = if working.len() % 2 == 1 {
      let picked = match ordering {
        RoundOrdering::BySeed => self.pick_weakest_seed(&working),
        RoundOrdering::PreserveOrder => working.last().cloned(),
      };
      if let Some(id) = &picked {
        working.retain(|w| w != id);
      }
      picked
    } else {
      None
    };

    let mut from_texts = HashMap::new();
    for id in working.iter().chain(bye_team_id.iter()) {
      let text = self
        .provenance_for(id)
        .unwrap_or_else(|| default_from.to_string());
      from_texts.insert(id.clone(), text);
    }

    let mut match_ids = Vec::new();
    let mut local_index = 1;
    for pair in working.chunks(2) {
      let a = &pair[0];
      let b = &pair[1];
      let slot_a = Slot::team(a, from_texts[a].clone());
      let slot_b = Slot::team(b, from_texts[b].clone());
      match_ids.push(self.push_match(bracket, round_index, local_index, slot_a, slot_b));
      local_index += 1;
    }

    if let Some(bye_id) = bye_team_id {
      let slot_a = Slot::team(&bye_id, from_texts[&bye_id].clone());
      let id = self.push_match(bracket, round_index, local_index, slot_a, Slot::bye());
      self.decide_match_by_bye(&id);
      match_ids.push(id);
    }

    Round {
      title,
      bracket,
      round_index,
      match_ids,
    }
  }

  fn sort_team_ids_by_seed(&self, mut ids: Vec<String>) -> Vec<String> {
    ids.sort_by_key(|id| self.team_by_id(id).map(|t| t.seed).unwrap_or(u32::MAX));
    ids
  }

  /// Highest seed number in the pool, i.e. the weakest entrant present.
  fn pick_weakest_seed(&self, ids: &[String]) -> Option<String> {
    ids
      .iter()
      .max_by_key(|id| self.team_by_id(id).map(|t| t.seed).unwrap_or(0))
      .cloned()
  }

  fn move_ids_to_front(ids: Vec<String>, to_front: &[String]) -> Vec<String> {
    let front_set = to_front.iter().collect::<HashSet<_>>();
    let mut front = Vec::new();
    let mut rest = Vec::new();
    for id in ids {
      if front_set.contains(&id) {
        front.push(id);
      } else {
        rest.push(id);
      }
    }
    front.extend(rest);
    front
  }

  /// Splits the Start round into WB Round 1 and LB Round 1, once.
  fn build_from_start(&mut self) -> bool {
    if !self.start_is_complete() {
      return false;
    }
    if !self.wb.is_empty() || !self.lb.is_empty() {
      return false;
    }
    let Some(start) = self.start.clone() else {
      return false;
    };

    let mut winners = Vec::new();
    let mut losers = Vec::new();
    for id in &start.match_ids {
      let Some(m) = self.match_by_id(id) else { continue };
      if !m.decided {
        continue;
      }
      if let Some(w) = &m.winner_id {
        winners.push(w.clone());
      }
      if let Some(l) = &m.loser_id {
        losers.push(l.clone());
      }
    }

    let mut changed = false;

    if winners.len() >= 2 {
      let bye_winners = self.bye_winners_of(&start);
      let entrants = Self::move_ids_to_front(winners, &bye_winners);
      let round = self.build_round(
        BracketKind::Winners,
        1,
        "WB Round 1".to_string(),
        entrants,
        RoundOrdering::PreserveOrder,
        "W of Start",
      );
      tracing::info!(matches = round.match_ids.len(), "built WB Round 1");
      self.wb.push(round);
      changed = true;
    }

    if losers.len() >= 2 {
      let round = self.build_round(
        BracketKind::Losers,
        1,
        "LB Round 1".to_string(),
        losers,
        RoundOrdering::BySeed,
        "L of Start",
      );
      tracing::info!(matches = round.match_ids.len(), "built LB Round 1");
      self.lb.push(round);
      changed = true;
    }

    changed
  }

  /// WB always holds the undefeated. When the last WB round settles and two
  /// or more undefeated teams are idle, the next round is built from them.
  fn try_next_wb_round(&mut self) -> bool {
    if self.champion_id.is_some() || !self.finals.is_empty() {
      return false;
    }
    if !self.start_is_complete() {
      return false;
    }
    let Some(last_wb) = self.wb.last().cloned() else {
      return false;
    };
    if !self.round_is_complete(&last_wb) {
      return false;
    }

    let candidates = self
      .teams
      .iter()
      .filter(|t| t.losses == 0)
      .map(|t| t.id.clone())
      .filter(|id| !self.team_is_in_undecided_match(id))
      .collect::<Vec<_>>();
    if candidates.len() < 2 {
      return false;
    }

    let next_index = self.wb.len() as u32 + 1;
    let bye_winners = self.bye_winners_of(&last_wb);
    let entrants = Self::move_ids_to_front(candidates, &bye_winners);
    let round = self.build_round(
      BracketKind::Winners,
      next_index,
      format!("WB Round {next_index}"),
      entrants,
      RoundOrdering::PreserveOrder,
      "Adv",
    );
    tracing::info!(round_index = next_index, matches = round.match_ids.len(), "built next WB round");
    self.wb.push(round);
    true
  }

  /// LB holds the one-loss teams; an undefeated team is never pulled down.
  fn try_next_lb_round(&mut self) -> bool {
    if self.champion_id.is_some() || !self.finals.is_empty() {
      return false;
    }
    if !self.start_is_complete() {
      return false;
    }
    let last_lb = self.lb.last().cloned();
    if let Some(round) = &last_lb {
      if !self.round_is_complete(round) {
        return false;
      }
    }

    let candidates = self
      .teams
      .iter()
      .filter(|t| t.losses == 1)
      .map(|t| t.id.clone())
      .filter(|id| !self.team_is_in_undecided_match(id))
      .collect::<Vec<_>>();
    if candidates.len() < 2 {
      return false;
    }

    let next_index = self.lb.len() as u32 + 1;
    let bye_winners = match &last_lb {
      Some(round) => self.bye_winners_of(round),
      None => Vec::new(),
    };
    let entrants = Self::move_ids_to_front(candidates, &bye_winners);
    let round = self.build_round(
      BracketKind::Losers,
      next_index,
      format!("LB Round {next_index}"),
      entrants,
      RoundOrdering::PreserveOrder,
      "Adv",
    );
    tracing::info!(round_index = next_index, matches = round.match_ids.len(), "built next LB round");
    self.lb.push(round);
    true
  }

  /// Exactly two teams left alive means the grand final. The one with fewer
  /// losses takes slot A as the WB side.
  fn try_build_finals(&mut self) -> bool {
    if self.champion_id.is_some() || !self.finals.is_empty() {
      return false;
    }
    let alive = self.alive_team_ids();
    if alive.len() != 2 {
      return false;
    }
    if alive.iter().any(|id| self.team_is_in_undecided_match(id)) {
      return false;
    }

    let losses_a = self.team_by_id(&alive[0]).map(|t| t.losses).unwrap_or(u32::MAX);
    let losses_b = self.team_by_id(&alive[1]).map(|t| t.losses).unwrap_or(u32::MAX);
    if losses_a == losses_b {
      // Not reachable through normal play; fall back to the lower seed.
      tracing::warn!(a = %alive[0], b = %alive[1], "finalists tied on losses, lower seed takes the WB slot");
    }
    let (wb_champ, lb_champ) = if losses_a <= losses_b {
      (alive[0].clone(), alive[1].clone())
    } else {
      (alive[1].clone(), alive[0].clone())
    };

    let slot_a = Slot::team(&wb_champ, "WB Champ".to_string());
    let slot_b = Slot::team(&lb_champ, "LB Champ".to_string());
    let match_id = self.push_match(BracketKind::Final, 1, 1, slot_a, slot_b);
    self.finals.push(Round {
      title: "Finals".to_string(),
      bracket: BracketKind::Final,
      round_index: 1,
      match_ids: vec![match_id],
    });
    tracing::info!(%wb_champ, %lb_champ, "built finals");
    true
  }

  /// After the grand final decides: a WB-side win is the championship, an
  /// LB-side win forces one reset match. The reset winner is champion.
  fn try_finals_reset_or_champion(&mut self) -> bool {
    if self.champion_id.is_some() {
      return false;
    }
    let (game1_id, reset_id) = match self.finals.first() {
      Some(round) => (
        round.match_ids.first().cloned(),
        round.match_ids.get(1).cloned(),
      ),
      None => return false,
    };
    let Some(game1_id) = game1_id else {
      return false;
    };
    let game1 = match self.match_by_id(&game1_id) {
      Some(m) => m.clone(),
      None => return false,
    };
    if !game1.decided {
      return false;
    }

    if game1.winner_id == game1.slot_a.team_id {
      self.champion_id = game1.winner_id.clone();
      tracing::info!(champion = ?self.champion_id, "champion decided in finals game 1");
      return true;
    }

    if let Some(reset_id) = reset_id {
      let Some(reset) = self.match_by_id(&reset_id) else {
        return false;
      };
      if reset.decided {
        if let Some(winner) = reset.winner_id.clone() {
          self.champion_id = Some(winner);
          tracing::info!(champion = ?self.champion_id, "champion decided in finals reset");
          return true;
        }
      }
      return false;
    }

    let slot_a = Slot {
      team_id: game1.slot_a.team_id.clone(),
      from_text: "WB Champ".to_string(),
    };
    let slot_b = Slot {
      team_id: game1.slot_b.team_id.clone(),
      from_text: "LB Champ".to_string(),
    };
    let reset_id = self.push_match(BracketKind::FinalReset, 1, 2, slot_a, slot_b);
    if let Some(round) = self.finals.first_mut() {
      round.match_ids.push(reset_id);
    }
    tracing::info!("built finals reset");
    true
  }

  /// Degenerate brackets can run dry before a finals match ever exists; the
  /// single survivor is champion.
  fn try_survivor_champion(&mut self) -> bool {
    if self.champion_id.is_some() || !self.finals.is_empty() {
      return false;
    }
    let alive = self.alive_team_ids();
    if alive.len() != 1 {
      return false;
    }
    self.champion_id = Some(alive[0].clone());
    tracing::info!(champion = %alive[0], "champion decided as only survivor");
    true
  }

  pub fn state(&self) -> BracketState {
    BracketState {
      teams: self.teams.iter().map(|t| self.team_view(t)).collect(),
      start: self.start.as_ref().map(|r| self.round_view(r)),
      winners: self.wb.iter().map(|r| self.round_view(r)).collect(),
      losers: self.lb.iter().map(|r| self.round_view(r)).collect(),
      finals: self.finals.iter().map(|r| self.round_view(r)).collect(),
      champion_id: self.champion_id.clone(),
      recommended_match_id: self.recommended_match_id(),
    }
  }

  fn team_view(&self, team: &Team) -> TeamView {
    let status = if self.champion_id.as_deref() == Some(team.id.as_str()) {
      "CHAMPION"
    } else if team.losses >= 2 {
      "ELIMINATED"
    } else {
      "ALIVE"
    };
    TeamView {
      id: team.id.clone(),
      seed: team.seed,
      name: team.name.clone(),
      members: team.members.clone(),
      wins: team.wins,
      losses: team.losses,
      status: status.to_string(),
    }
  }

  fn round_view(&self, round: &Round) -> RoundView {
    RoundView {
      title: round.title.clone(),
      bracket: round.bracket,
      round_index: round.round_index,
      matches: round
        .match_ids
        .iter()
        .filter_map(|id| self.match_by_id(id))
        .map(|m| self.match_view(m))
        .collect(),
    }
  }

  fn match_view(&self, m: &BracketMatch) -> MatchView {
    MatchView {
      match_id: m.match_id.clone(),
      number: m.number,
      bracket: m.bracket,
      round_index: m.round_index,
      decided: m.decided,
      decided_by_bye: m.decided_by_bye,
      winner_id: m.winner_id.clone(),
      loser_id: m.loser_id.clone(),
      clickable: m.decidable(),
      slot_a: self.slot_view(m, &m.slot_a),
      slot_b: self.slot_view(m, &m.slot_b),
    }
  }

  fn slot_view(&self, m: &BracketMatch, slot: &Slot) -> SlotView {
    let team = slot.team_id.as_deref().and_then(|id| self.team_by_id(id));
    let name = if slot.is_bye() {
      "BYE".to_string()
    } else {
      match team {
        Some(t) => t.name.clone(),
        None => "—".to_string(),
      }
    };
    let winner = m.decided && slot.team_id.is_some() && m.winner_id == slot.team_id;
    SlotView {
      team_id: slot.team_id.clone(),
      name,
      seed: team.map(|t| t.seed),
      from_text: slot.from_text.clone(),
      winner,
      loser: m.decided && slot.team_id.is_some() && m.loser_id == slot.team_id,
      advanced_by_bye: m.decided_by_bye && winner,
    }
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketState {
  pub teams: Vec<TeamView>,
  pub start: Option<RoundView>,
  pub winners: Vec<RoundView>,
  pub losers: Vec<RoundView>,
  pub finals: Vec<RoundView>,
  pub champion_id: Option<String>,
  pub recommended_match_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
  pub id: String,
  pub seed: u32,
  pub name: String,
  pub members: [String; 2],
  pub wins: u32,
  pub losses: u32,
  pub status: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
  pub title: String,
  pub bracket: BracketKind,
  pub round_index: u32,
  pub matches: Vec<MatchView>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
  pub match_id: String,
  pub number: u32,
  pub bracket: BracketKind,
  pub round_index: u32,
  pub decided: bool,
  pub decided_by_bye: bool,
  pub winner_id: Option<String>,
  pub loser_id: Option<String>,
  pub clickable: bool,
  pub slot_a: SlotView,
  pub slot_b: SlotView,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
  pub team_id: Option<String>,
  pub name: String,
  pub seed: Option<u32>,
  pub from_text: String,
  pub winner: bool,
  pub loser: bool,
  pub advanced_by_bye: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn make_teams(count: u32) -> Vec<Team> {
    (1..=count)
      .map(|seed| {
        let m1 = format!("P{}", seed * 2 - 1);
        let m2 = format!("P{}", seed * 2);
        Team {
          id: format!("t{seed:02}"),
          seed,
          name: format!("{m1} / {m2}"),
          members: [m1, m2],
          wins: 0,
          losses: 0,
        }
      })
      .collect()
  }

  fn undecided_ids(t: &Tournament) -> Vec<String> {
    t.matches()
      .iter()
      .filter(|m| !m.decided)
      .map(|m| m.match_id.clone())
      .collect()
  }

  #[test]
  fn start_round_pairs_by_seed() {
    let t = Tournament::new(make_teams(4)).unwrap();
    let matches = t.matches();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].match_id, "START-R1-M1");
    assert_eq!(matches[0].slot_a.team_id.as_deref(), Some("t01"));
    assert_eq!(matches[0].slot_b.team_id.as_deref(), Some("t02"));
    assert_eq!(matches[1].slot_a.team_id.as_deref(), Some("t03"));
    assert_eq!(matches[1].slot_b.team_id.as_deref(), Some("t04"));
    assert_eq!(matches[0].slot_a.from_text, "Seeded");
  }

  #[test]
  fn odd_start_gives_one_bye_to_weakest_seed() {
    let t = Tournament::new(make_teams(5)).unwrap();
    let byes = t
      .matches()
      .iter()
      .filter(|m| m.decided_by_bye)
      .collect::<Vec<_>>();
    assert_eq!(byes.len(), 1);
    let bye = byes[0];
    assert_eq!(bye.slot_a.team_id.as_deref(), Some("t05"));
    assert!(bye.slot_b.is_bye());
    assert_eq!(bye.winner_id.as_deref(), Some("t05"));
    assert_eq!(bye.loser_id, None);
    // The bye match is numbered after the pair matches.
    assert_eq!(bye.number, 3);
    // No win credit for the free pass.
    let t05 = t.team_by_id("t05").unwrap();
    assert_eq!(t05.wins, 0);
    assert_eq!(t05.losses, 0);
  }

  #[test]
  fn match_numbers_follow_creation_order() {
    let mut t = Tournament::new(make_teams(5)).unwrap();
    while let Some(id) = t.recommended_match_id() {
      let winner = t.match_by_id(&id).unwrap().slot_a.team_id.clone().unwrap();
      assert!(t.decide(&id, &winner));
    }
    for (idx, m) in t.matches().iter().enumerate() {
      assert_eq!(m.number as usize, idx + 1);
    }
    assert!(t.champion_id().is_some());
  }

  #[test]
  fn invalid_decisions_are_silent_noops() {
    let mut t = Tournament::new(make_teams(4)).unwrap();
    assert!(!t.decide("WB-R9-M9", "t01"));
    assert!(!t.decide("START-R1-M1", "t03"));
    assert!(t.decide("START-R1-M1", "t01"));
    assert!(!t.decide("START-R1-M1", "t02"));
    let t01 = t.team_by_id("t01").unwrap();
    assert_eq!(t01.wins, 1);
  }

  #[test]
  fn bye_match_is_never_decidable() {
    let mut t = Tournament::new(make_teams(5)).unwrap();
    t.decide("START-R1-M1", "t01");
    t.decide("START-R1-M2", "t03");
    // WB round 1 is odd again; its bye match rejects manual decisions.
    let bye_id = t
      .matches()
      .iter()
      .filter(|m| m.bracket == BracketKind::Winners && m.decided_by_bye)
      .map(|m| m.match_id.clone())
      .next()
      .unwrap();
    let winner = t.match_by_id(&bye_id).unwrap().winner_id.clone().unwrap();
    assert!(!t.decide(&bye_id, &winner));
  }

  #[test]
  fn start_split_moves_bye_winner_to_front() {
    let mut t = Tournament::new(make_teams(5)).unwrap();
    t.decide("START-R1-M1", "t01");
    t.decide("START-R1-M2", "t03");

    // WB pool is [t05 (bye winner), t01, t03]; odd, so the last preserved
    // entrant t03 takes the bye.
    let wb_pair = t.match_by_id("WB-R1-M1").unwrap();
    assert_eq!(wb_pair.slot_a.team_id.as_deref(), Some("t05"));
    assert_eq!(wb_pair.slot_b.team_id.as_deref(), Some("t01"));
    assert_eq!(wb_pair.slot_a.from_text, "W of M3");
    assert_eq!(wb_pair.slot_b.from_text, "W of M1");
    let wb_bye = t.match_by_id("WB-R1-M2").unwrap();
    assert_eq!(wb_bye.winner_id.as_deref(), Some("t03"));
    assert!(wb_bye.decided_by_bye);

    // LB round 1 holds exactly the start losers, seed order.
    let lb = t.match_by_id("LB-R1-M1").unwrap();
    assert_eq!(lb.slot_a.team_id.as_deref(), Some("t02"));
    assert_eq!(lb.slot_b.team_id.as_deref(), Some("t04"));
    assert_eq!(lb.slot_a.from_text, "L of M1");
    assert_eq!(lb.slot_b.from_text, "L of M2");
  }

  #[test]
  fn losers_bracket_never_holds_an_undefeated_team() {
    let mut t = Tournament::new(make_teams(5)).unwrap();
    while let Some(id) = t.recommended_match_id() {
      let winner = t.match_by_id(&id).unwrap().slot_a.team_id.clone().unwrap();
      t.decide(&id, &winner);
      let state = t.state();
      for round in &state.losers {
        for m in &round.matches {
          for slot in [&m.slot_a, &m.slot_b] {
            if let Some(team_id) = &slot.team_id {
              let team = t.team_by_id(team_id).unwrap();
              // A team lands in LB only by losing first.
              assert!(team.losses >= 1, "{team_id} entered LB undefeated");
            }
          }
        }
      }
    }
  }

  #[test]
  fn two_losses_eliminate() {
    let mut t = Tournament::new(make_teams(4)).unwrap();
    t.decide("START-R1-M1", "t01");
    t.decide("START-R1-M2", "t03");
    t.decide("WB-R1-M1", "t01");
    t.decide("LB-R1-M1", "t02");
    let t04 = t.team_by_id("t04").unwrap();
    assert_eq!(t04.losses, 2);
    let state = t.state();
    let view = state.teams.iter().find(|v| v.id == "t04").unwrap();
    assert_eq!(view.status, "ELIMINATED");
    // Eliminated teams never get scheduled again.
    assert!(!undecided_ids(&t)
      .iter()
      .any(|id| t.match_by_id(id).unwrap().has_team("t04")));
  }

  #[test]
  fn four_team_run_wb_side_wins_finals() {
    let mut t = Tournament::new(make_teams(4)).unwrap();
    t.decide("START-R1-M1", "t01");
    t.decide("START-R1-M2", "t03");
    t.decide("WB-R1-M1", "t01");
    t.decide("LB-R1-M1", "t02");
    t.decide("LB-R2-M1", "t03");

    let finals = t.match_by_id("FINALS-R1-M1").unwrap();
    assert_eq!(finals.slot_a.team_id.as_deref(), Some("t01"));
    assert_eq!(finals.slot_a.from_text, "WB Champ");
    assert_eq!(finals.slot_b.team_id.as_deref(), Some("t03"));
    assert_eq!(finals.slot_b.from_text, "LB Champ");

    assert!(t.decide("FINALS-R1-M1", "t01"));
    assert_eq!(t.champion_id(), Some("t01"));
    // No reset after a WB-side win.
    assert!(t.match_by_id("FINALS-R1-M2").is_none());
    // Frozen: nothing further can be decided.
    assert!(undecided_ids(&t).is_empty());
  }

  #[test]
  fn lb_side_win_forces_one_reset() {
    let mut t = Tournament::new(make_teams(4)).unwrap();
    t.decide("START-R1-M1", "t01");
    t.decide("START-R1-M2", "t03");
    t.decide("WB-R1-M1", "t01");
    t.decide("LB-R1-M1", "t02");
    t.decide("LB-R2-M1", "t03");

    assert!(t.decide("FINALS-R1-M1", "t03"));
    assert_eq!(t.champion_id(), None);
    let reset = t.match_by_id("FINALS-R1-M2").unwrap();
    assert_eq!(reset.bracket, BracketKind::FinalReset);
    assert_eq!(reset.slot_a.team_id.as_deref(), Some("t01"));
    assert_eq!(reset.slot_b.team_id.as_deref(), Some("t03"));

    assert!(t.decide("FINALS-R1-M2", "t03"));
    assert_eq!(t.champion_id(), Some("t03"));
    // Only ever one reset.
    let finals_matches = t
      .matches()
      .iter()
      .filter(|m| matches!(m.bracket, BracketKind::Final | BracketKind::FinalReset))
      .count();
    assert_eq!(finals_matches, 2);
  }

  #[test]
  fn two_team_bracket_goes_straight_to_finals() {
    let mut t = Tournament::new(make_teams(2)).unwrap();
    t.decide("START-R1-M1", "t01");
    let finals = t.match_by_id("FINALS-R1-M1").unwrap();
    assert_eq!(finals.slot_a.team_id.as_deref(), Some("t01"));
    assert_eq!(finals.slot_b.team_id.as_deref(), Some("t02"));
    t.decide("FINALS-R1-M1", "t02");
    // LB side won game 1, so the reset decides it.
    t.decide("FINALS-R1-M2", "t02");
    assert_eq!(t.champion_id(), Some("t02"));
  }

  #[test]
  fn single_entrant_is_survivor_champion() {
    let t = Tournament::new(make_teams(1)).unwrap();
    assert_eq!(t.champion_id(), Some("t01"));
  }

  #[test]
  fn one_bye_per_round_at_most() {
    let mut t = Tournament::new(make_teams(7)).unwrap();
    while let Some(id) = t.recommended_match_id() {
      let winner = t.match_by_id(&id).unwrap().slot_b.team_id.clone().unwrap();
      t.decide(&id, &winner);
      let state = t.state();
      let rounds = state
        .start
        .iter()
        .chain(state.winners.iter())
        .chain(state.losers.iter());
      for round in rounds {
        let byes = round.matches.iter().filter(|m| m.decided_by_bye).count();
        assert!(byes <= 1, "{} has {byes} byes", round.title);
      }
    }
    assert!(t.champion_id().is_some());
  }

  #[test]
  fn render_state_marks_bye_and_clickable() {
    let t = Tournament::new(make_teams(5)).unwrap();
    let state = t.state();
    let start = state.start.unwrap();
    let bye = &start.matches[2];
    assert_eq!(bye.slot_b.name, "BYE");
    assert!(!bye.clickable);
    assert!(bye.slot_a.advanced_by_bye);
    assert!(start.matches[0].clickable);
    assert_eq!(state.recommended_match_id.as_deref(), Some("START-R1-M1"));
  }
}
