use std::path::Path;

use super::{parse_f64, parse_i64, LineCursor, LoadError};
use crate::models::channel::Channel;
use crate::models::node::NodeKind;
use crate::models::powerstation::Powerstation;
use crate::models::qmin::{QminPeriod, QminSchedule, MAX_QMIN_PERIODS};
use crate::models::reservoir::{AutoQminOutlet, HatchOutlet, Reservoir};

/// One node as declared in the topology file, before scenarios and state
/// are attached.
#[derive(Debug)]
pub struct NodeBuild {
    pub idnr: usize,
    pub name: String,
    pub downstream: Option<usize>,
    pub kind: NodeKind,
}

/// Parse the topology file into node builds, in file order.
///
/// Nodes must be declared in topological order: the file's declaration
/// order defines the per-timestep evaluation order, and every downstream
/// reference must point at a later node. That property is checked when the
/// river system is assembled.
pub fn load(path: &Path) -> Result<Vec<NodeBuild>, LoadError> {
    let mut cursor = LineCursor::open(path)?;
    let mut builds = Vec::new();

    while !cursor.is_empty() {
        let line = cursor.next_line()?.to_string();
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("NODE") {
            return Err(cursor.error("expected a NODE block"));
        }
        let node_type = tokens
            .next()
            .ok_or_else(|| cursor.error("NODE line is missing a type"))?
            .to_string();
        let idnr_tok = tokens
            .next()
            .ok_or_else(|| cursor.error("NODE line is missing an idnr"))?;
        let idnr = parse_i64(&cursor, idnr_tok, "node idnr")? as usize;
        let name = tokens
            .next()
            .ok_or_else(|| cursor.error("NODE line is missing a name"))?
            .to_string();
        let trailing: Vec<String> = tokens.map(|t| t.to_string()).collect();

        let build = match node_type.as_str() {
            "RESERVOIR" => read_reservoir(&mut cursor, idnr, name)?,
            "PSTATION" => read_powerstation(&mut cursor, idnr, name)?,
            "CHANNEL" => read_channel(&mut cursor, idnr, name, &trailing)?,
            other => {
                return Err(cursor.error(format!("unknown node type '{}'", other)));
            }
        };
        builds.push(build);
    }

    if builds.is_empty() {
        return Err(LoadError::format(
            cursor.file(),
            0,
            "topology file declares no nodes",
        ));
    }
    Ok(builds)
}

fn expect_key<'a>(
    cursor: &LineCursor,
    line: &'a str,
    key: &str,
) -> Result<Vec<&'a str>, LoadError> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(key) {
        return Err(cursor.error(format!("expected keyword {}", key)));
    }
    Ok(tokens.collect())
}

fn read_keyed_f64(cursor: &mut LineCursor, key: &str) -> Result<f64, LoadError> {
    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, key)?;
    let value = rest
        .first()
        .ok_or_else(|| cursor.error(format!("{} is missing its value", key)))?;
    parse_f64(cursor, value, key)
}

fn read_point_lines(
    cursor: &mut LineCursor,
    n: usize,
    what: &str,
) -> Result<Vec<(f64, f64)>, LoadError> {
    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        let line = cursor.next_line()?.to_string();
        let mut tokens = line.split_whitespace();
        let (Some(a), Some(b)) = (tokens.next(), tokens.next()) else {
            return Err(cursor.error(format!("{} point needs two columns", what)));
        };
        points.push((parse_f64(cursor, a, what)?, parse_f64(cursor, b, what)?));
    }
    Ok(points)
}

/// Parse `DD.MM DD.MM min_discharge [penalty]` period lines.
fn read_qmin_periods(
    cursor: &mut LineCursor,
    n: usize,
    with_penalty: bool,
) -> Result<QminSchedule, LoadError> {
    if n > MAX_QMIN_PERIODS {
        return Err(cursor.error(format!(
            "at most {} qmin periods are supported, got {}",
            MAX_QMIN_PERIODS, n
        )));
    }
    let mut periods = Vec::with_capacity(n);
    for _ in 0..n {
        let line = cursor.next_line()?.to_string();
        let mut tokens = line.split_whitespace();
        let (Some(start), Some(end), Some(min_q)) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(cursor.error("qmin period needs 'DD.MM DD.MM min_discharge'"));
        };
        let (start_day, start_month) = parse_day_month(cursor, start)?;
        let (end_day, end_month) = parse_day_month(cursor, end)?;
        let min_discharge = parse_f64(cursor, min_q, "minimum discharge")?;
        let penalty = if with_penalty {
            let p = tokens
                .next()
                .ok_or_else(|| cursor.error("qmin period is missing its penalty cost"))?;
            parse_f64(cursor, p, "penalty cost")?
        } else {
            // Automatic releases carry no penalty of their own; shortfalls
            // are charged where they are observed.
            0.0
        };

        let period = QminPeriod::new(
            start_day,
            start_month,
            end_day,
            end_month,
            min_discharge,
            penalty,
        )
        .ok_or_else(|| cursor.error("qmin period has an invalid calendar date"))?;
        periods.push(period);
    }
    Ok(QminSchedule::new(periods))
}

fn parse_day_month(cursor: &LineCursor, token: &str) -> Result<(u32, u32), LoadError> {
    let mut parts = token.split('.');
    let (Some(day), Some(month)) = (parts.next(), parts.next()) else {
        return Err(cursor.error(format!("expected DD.MM, got '{}'", token)));
    };
    let day = day
        .parse::<u32>()
        .map_err(|_| cursor.error(format!("bad day in '{}'", token)))?;
    let month = month
        .parse::<u32>()
        .map_err(|_| cursor.error(format!("bad month in '{}'", token)))?;
    Ok((day, month))
}

fn read_reservoir(
    cursor: &mut LineCursor,
    idnr: usize,
    name: String,
) -> Result<NodeBuild, LoadError> {
    let hrw = read_keyed_f64(cursor, "HRW")?;
    let lrw = read_keyed_f64(cursor, "LRW")?;
    let penalty = read_keyed_f64(cursor, "RES_PENALTY")?;

    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "RESERVOIR_CURVE")?;
    let n = parse_i64(cursor, rest.first().copied().unwrap_or(""), "curve point count")? as usize;
    let level_points = read_point_lines(cursor, n, "reservoir curve")?;

    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "OVERFLOW_CURVE")?;
    let (Some(n_tok), Some(ds_tok)) = (rest.first(), rest.get(1)) else {
        return Err(cursor.error("OVERFLOW_CURVE needs a point count and a downstream idnr"));
    };
    let n = parse_i64(cursor, n_tok, "curve point count")? as usize;
    let overflow_downstream = parse_i64(cursor, ds_tok, "overflow downstream idnr")?;
    if overflow_downstream < 0 {
        return Err(cursor.error("every reservoir needs an overflow downstream node"));
    }
    let overflow_points = read_point_lines(cursor, n, "overflow curve")?;

    let mut reservoir = Reservoir::new(
        hrw,
        lrw,
        penalty,
        &level_points,
        &overflow_points,
        overflow_downstream as usize,
    )
    .map_err(|e| cursor.error(format!("reservoir '{}': {}", name, e)))?;

    // OUTLET_HATCH <downstream|-1> [minQ maxQ hatch_masl]
    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "OUTLET_HATCH")?;
    let hatch_ds = parse_i64(
        cursor,
        rest.first().copied().unwrap_or(""),
        "hatch downstream idnr",
    )?;
    if hatch_ds > -1 {
        let (Some(min_q), Some(max_q), Some(hatch_masl)) =
            (rest.get(1), rest.get(2), rest.get(3))
        else {
            return Err(cursor.error("OUTLET_HATCH needs minQ, maxQ and hatch_masl"));
        };
        reservoir.hatch = Some(HatchOutlet {
            downstream: hatch_ds as usize,
            min_q_m3s: parse_f64(cursor, min_q, "hatch minQ")?,
            max_q_m3s: parse_f64(cursor, max_q, "hatch maxQ")?,
            hatch_masl: parse_f64(cursor, hatch_masl, "hatch_masl")?,
        });
    }

    // OUTLET_TUNNEL <downstream|-9>
    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "OUTLET_TUNNEL")?;
    let tunnel_ds = parse_i64(
        cursor,
        rest.first().copied().unwrap_or(""),
        "tunnel downstream idnr",
    )?;
    if tunnel_ds >= 0 {
        reservoir.tunnel_downstream = Some(tunnel_ds as usize);
    }

    // OUTLET_AUTO_QMIN <n_periods|-9999> [downstream]
    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "OUTLET_AUTO_QMIN")?;
    let n_periods = parse_i64(
        cursor,
        rest.first().copied().unwrap_or(""),
        "auto qmin period count",
    )?;
    if n_periods >= 0 {
        let ds = rest
            .get(1)
            .ok_or_else(|| cursor.error("OUTLET_AUTO_QMIN needs a downstream idnr"))?;
        let downstream = parse_i64(cursor, ds, "auto qmin downstream idnr")?;
        if downstream < 0 {
            return Err(cursor.error("auto qmin downstream idnr must be a node"));
        }
        let schedule = read_qmin_periods(cursor, n_periods as usize, false)?;
        reservoir.auto_qmin = Some(AutoQminOutlet {
            downstream: downstream as usize,
            schedule,
        });
    }

    // The tunnel target is the primary downstream when present, the
    // overflow target otherwise.
    let downstream = reservoir
        .tunnel_downstream
        .or(Some(reservoir.overflow_downstream));

    Ok(NodeBuild {
        idnr,
        name,
        downstream,
        kind: NodeKind::Reservoir(reservoir),
    })
}

fn read_powerstation(
    cursor: &mut LineCursor,
    idnr: usize,
    name: String,
) -> Result<NodeBuild, LoadError> {
    let downlink = read_keyed_f64(cursor, "DOWNLINK_IDNR")? as i64;

    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "TURBINE_CURVE")?;
    let n = parse_i64(cursor, rest.first().copied().unwrap_or(""), "curve point count")? as usize;
    let turbine_points = read_point_lines(cursor, n, "turbine curve")?;

    let static_gen_efficiency = read_keyed_f64(cursor, "STATIC_GENERATOR_EFFICIENCY")?;
    let headloss_coef = read_keyed_f64(cursor, "HEADLOSSCOEF")?;
    let tailrace_masl = read_keyed_f64(cursor, "POWSTAT_MASL")?;
    let min_discharge = read_keyed_f64(cursor, "POWSTAT_MIN_DISCHARGE")?;
    let max_discharge = read_keyed_f64(cursor, "POWSTAT_MAX_DISCHARGE")?;
    let startstop = read_keyed_f64(cursor, "POWSTAT_STARTSTOP")?;
    let energy_equivalent = read_keyed_f64(cursor, "LOCAL_ENERGY_EQUIVALENT")?;
    let auto_qmin = read_keyed_f64(cursor, "AUTO_QMIN")?;

    let mut powerstation = Powerstation::new(
        &turbine_points,
        static_gen_efficiency,
        headloss_coef,
        tailrace_masl,
        min_discharge,
        max_discharge,
        startstop,
        energy_equivalent,
        // Sentinel values like -9999 mean no baseline release.
        if auto_qmin > 0.0 { auto_qmin } else { 0.0 },
    )
    .map_err(|e| cursor.error(format!("powerstation '{}': {}", name, e)))?;

    // MAX_ADJUST <n|-1> [cost]
    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "MAX_ADJUST")?;
    let max_adjust = parse_i64(
        cursor,
        rest.first().copied().unwrap_or(""),
        "max adjustments per day",
    )?;
    if max_adjust > -1 {
        let cost = rest
            .get(1)
            .ok_or_else(|| cursor.error("MAX_ADJUST needs a cost when enabled"))?;
        powerstation.max_adjustment_pr_day = max_adjust as i32;
        powerstation.max_adjustment_cost = parse_f64(cursor, cost, "max adjustment cost")?;
    }

    Ok(NodeBuild {
        idnr,
        name,
        downstream: (downlink >= 0).then_some(downlink as usize),
        kind: NodeKind::Powerstation(powerstation),
    })
}

fn read_channel(
    cursor: &mut LineCursor,
    idnr: usize,
    name: String,
    trailing: &[String],
) -> Result<NodeBuild, LoadError> {
    let downstream = match trailing.first() {
        Some(tok) => {
            let ds = parse_i64(cursor, tok, "channel downstream idnr")?;
            (ds >= 0).then_some(ds as usize)
        }
        None => None,
    };

    let traveltime = read_keyed_f64(cursor, "TRAVELTIME")? as i64;
    if traveltime < 0 {
        return Err(cursor.error("TRAVELTIME cannot be negative"));
    }
    let decay = read_keyed_f64(cursor, "DECAY")?;
    if !(decay > 0.0 && decay <= 1.0) {
        return Err(cursor.error("DECAY must be in (0, 1]"));
    }

    let mut channel = Channel::new(traveltime as usize, decay);

    // QMIN <n> followed by period lines with penalty costs.
    let line = cursor.next_line()?.to_string();
    let rest = expect_key(cursor, &line, "QMIN")?;
    let n_periods = parse_i64(
        cursor,
        rest.first().copied().unwrap_or(""),
        "qmin period count",
    )?;
    if n_periods > 0 {
        channel.qmin = Some(read_qmin_periods(cursor, n_periods as usize, true)?);
    }

    Ok(NodeBuild {
        idnr,
        name,
        downstream,
        kind: NodeKind::Channel(channel),
    })
}
