use std::path::Path;

use super::{parse_f64, LineCursor, LoadError};
use crate::data::topology::NodeBuild;
use crate::models::node::NodeKind;

/// Load the start-state file and install initial conditions on the node
/// builds. Every node in the topology must appear exactly once:
///
/// ```text
/// NODE RESERVOIR <id> <name> <init_fr>
/// NODE PSTATION  <id> <name> <init_power>
/// NODE CHANNEL   <id> <name>
/// <traveltime cell volumes in m3, one line>
/// ```
pub fn apply_start_state(path: &Path, builds: &mut [NodeBuild]) -> Result<(), LoadError> {
    let mut cursor = LineCursor::open(path)?;
    let mut found = vec![false; builds.len()];

    while !cursor.is_empty() {
        let line = cursor.next_line()?.to_string();
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("NODE") {
            return Err(cursor.error("expected a NODE state line"));
        }
        let node_type = tokens
            .next()
            .ok_or_else(|| cursor.error("state line is missing a node type"))?
            .to_string();
        let idnr_tok = tokens
            .next()
            .ok_or_else(|| cursor.error("state line is missing an idnr"))?;
        let idnr = idnr_tok
            .parse::<usize>()
            .map_err(|_| cursor.error(format!("bad node idnr '{}'", idnr_tok)))?;
        let name = tokens
            .next()
            .ok_or_else(|| cursor.error("state line is missing a node name"))?
            .to_string();

        let build = builds.get_mut(idnr).ok_or_else(|| {
            cursor.error(format!("state refers to unknown node idnr {}", idnr))
        })?;
        if build.name != name {
            return Err(cursor.error(format!(
                "state line names node {} '{}' but the topology calls it '{}'",
                idnr, name, build.name
            )));
        }

        match (&mut build.kind, node_type.as_str()) {
            (NodeKind::Reservoir(r), "RESERVOIR") => {
                let value = tokens
                    .next()
                    .ok_or_else(|| cursor.error("reservoir state needs an initial fraction"))?;
                r.init_fr = parse_f64(&cursor, value, "initial reservoir fraction")?;
            }
            (NodeKind::Powerstation(p), "PSTATION") => {
                let value = tokens
                    .next()
                    .ok_or_else(|| cursor.error("powerstation state needs an initial power"))?;
                p.init_power_mwh = parse_f64(&cursor, value, "initial power")?;
            }
            (NodeKind::Channel(c), "CHANNEL") => {
                if c.traveltime > 0 {
                    let cells_line = cursor.next_line()?.to_string();
                    let mut cells = Vec::with_capacity(c.traveltime);
                    for tok in cells_line.split_whitespace() {
                        cells.push(parse_f64(&cursor, tok, "channel cell volume")?);
                    }
                    if cells.len() != c.traveltime {
                        return Err(cursor.error(format!(
                            "channel {} expects {} cell volumes, got {}",
                            idnr,
                            c.traveltime,
                            cells.len()
                        )));
                    }
                    c.set_initial_storage(&cells);
                }
            }
            (_, declared) => {
                return Err(cursor.error(format!(
                    "state line declares node {} as {} but the topology disagrees",
                    idnr, declared
                )));
            }
        }
        found[idnr] = true;
    }

    if let Some(missing) = found.iter().position(|f| !f) {
        return Err(LoadError::format(
            cursor.file(),
            0,
            format!(
                "no state found for node {} '{}'",
                missing, builds[missing].name
            ),
        ));
    }
    Ok(())
}
