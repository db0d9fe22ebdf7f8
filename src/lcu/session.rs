// Champion-select session helpers

use serde_json::Value;

fn team<'a>(session: &'a Value, key: &str) -> &'a [Value] {
  session
    .get(key)
    .and_then(|v| v.as_array())
    .map(Vec::as_slice)
    .unwrap_or(&[])
}

/// True when the local player's cell is listed in `myTeam`.
pub fn local_team_is_my_team(session: &Value) -> bool {
  let local_cell = match session.get("localPlayerCellId").and_then(|v| v.as_i64()) {
    Some(id) => id,
    None => return true,
  };
  team(session, "myTeam")
    .iter()
    .any(|p| p.get("cellId").and_then(|v| v.as_i64()) == Some(local_cell))
}

// Enemy champion ids in slot order; unpicked slots (id 0) are skipped
pub fn enemy_champion_ids(session: &Value) -> Vec<i64> {
  let enemy_key = if local_team_is_my_team(session) {
    "theirTeam"
  } else {
    "myTeam"
  };
  team(session, enemy_key)
    .iter()
    .filter_map(|p| p.get("championId").and_then(|v| v.as_i64()))
    .filter(|id| *id > 0)
    .collect()
}
