use std::path::Path;

use chrono::NaiveDate;

use super::{parse_f64, LineCursor, LoadError};
use crate::config::constants::{MAX_REASONABLE_INFLOW_M3S, MAX_REASONABLE_PRICE_EUR};
use crate::config::global_config::GlobalConfig;

/// Exogenous input series for one simulation run.
///
/// All nodes sit in the same price area, so a single price series covers
/// the system. Inflow and action series are allocated for every node and
/// default to zero; the input files list values only for the nodes they
/// name in their header.
#[derive(Debug)]
pub struct Dataset {
    pub stps: usize,
    pub restprice: f64,
    pub price: Vec<f64>,
    pub year: Vec<i32>,
    pub month: Vec<u32>,
    pub day: Vec<u32>,
    pub hour: Vec<u32>,
    /// Indexed [node][timestep], m3/s.
    pub inflow: Vec<Vec<f64>>,
    /// Indexed [node][timestep], dimensionless setpoints.
    pub action: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn load(gc: &GlobalConfig, nr_nodes: usize) -> Result<Dataset, LoadError> {
        let mut data = read_price_file(&gc.pricefile)?;
        data.inflow = vec![vec![0.0; data.stps]; nr_nodes];
        data.action = vec![vec![0.0; data.stps]; nr_nodes];
        read_series_file(
            &gc.inflowfile,
            data.stps,
            nr_nodes,
            &mut data.inflow,
            Some(MAX_REASONABLE_INFLOW_M3S),
        )?;
        read_series_file(&gc.actionsfile, data.stps, nr_nodes, &mut data.action, None)?;
        Ok(data)
    }
}

/// Parse a YYYYMMDDHH stamp, validating it against the calendar.
fn parse_date_stamp(
    cursor: &LineCursor,
    stamp: &str,
) -> Result<(i32, u32, u32, u32), LoadError> {
    if stamp.len() != 10 || !stamp.chars().all(|c| c.is_ascii_digit()) {
        return Err(cursor.error(format!("date '{}' is not YYYYMMDDHH", stamp)));
    }
    let year: i32 = stamp[0..4].parse().unwrap_or(0);
    let month: u32 = stamp[4..6].parse().unwrap_or(0);
    let day: u32 = stamp[6..8].parse().unwrap_or(0);
    let hour: u32 = stamp[8..10].parse().unwrap_or(99);
    if NaiveDate::from_ymd_opt(year, month, day).is_none() || hour > 23 {
        return Err(cursor.error(format!("'{}' is not a valid date", stamp)));
    }
    Ok((year, month, day, hour))
}

fn read_price_file(path: &Path) -> Result<Dataset, LoadError> {
    let mut cursor = LineCursor::open(path)?;

    let line = cursor.next_line()?.to_string();
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("RESTPRICE") {
        return Err(cursor.error("price file must start with 'RESTPRICE <value>'"));
    }
    let restprice_tok = tokens
        .next()
        .ok_or_else(|| cursor.error("RESTPRICE is missing its value"))?;
    let restprice = parse_f64(&cursor, restprice_tok, "rest price")?;

    let header = cursor.next_line()?.to_string();
    if header.split_whitespace().next() != Some("Date") {
        return Err(cursor.error("price file needs a 'Date' header line"));
    }

    let mut data = Dataset {
        stps: 0,
        restprice,
        price: Vec::new(),
        year: Vec::new(),
        month: Vec::new(),
        day: Vec::new(),
        hour: Vec::new(),
        inflow: Vec::new(),
        action: Vec::new(),
    };

    while !cursor.is_empty() {
        let line = cursor.next_line()?.to_string();
        let mut tokens = line.split_whitespace();
        let (Some(stamp), Some(price_tok)) = (tokens.next(), tokens.next()) else {
            return Err(cursor.error("price line needs a date and a price"));
        };
        let (year, month, day, hour) = parse_date_stamp(&cursor, stamp)?;
        let price = parse_f64(&cursor, price_tok, "price")?;
        if !(0.0..=MAX_REASONABLE_PRICE_EUR).contains(&price) {
            return Err(cursor.error(format!(
                "price {} outside the plausible range [0, {}]",
                price, MAX_REASONABLE_PRICE_EUR
            )));
        }
        data.year.push(year);
        data.month.push(month);
        data.day.push(day);
        data.hour.push(hour);
        data.price.push(price);
    }

    data.stps = data.price.len();
    if data.stps == 0 {
        return Err(LoadError::format(cursor.file(), 0, "price file has no timesteps"));
    }
    Ok(data)
}

/// Read a `Date_NodeID` column file into per-node series. The header lists
/// the node ids the following columns belong to; nodes that are not listed
/// keep their zero series.
fn read_series_file(
    path: &Path,
    stps: usize,
    nr_nodes: usize,
    series: &mut [Vec<f64>],
    max_value: Option<f64>,
) -> Result<(), LoadError> {
    let mut cursor = LineCursor::open(path)?;

    let header = cursor.next_line()?.to_string();
    let mut tokens = header.split_whitespace();
    if tokens.next() != Some("Date_NodeID") {
        return Err(cursor.error("series file must start with a 'Date_NodeID' header"));
    }
    let mut idnrs = Vec::new();
    for tok in tokens {
        let idnr = tok
            .parse::<usize>()
            .map_err(|_| cursor.error(format!("bad node idnr '{}' in header", tok)))?;
        if idnr >= nr_nodes {
            return Err(cursor.error(format!(
                "header names node {} but the topology has {} nodes",
                idnr, nr_nodes
            )));
        }
        idnrs.push(idnr);
    }

    for t in 0..stps {
        if cursor.is_empty() {
            return Err(LoadError::format(
                cursor.file(),
                0,
                format!("expected {} data rows, found {}", stps, t),
            ));
        }
        let line = cursor.next_line()?.to_string();
        let mut tokens = line.split_whitespace();
        let _date = tokens
            .next()
            .ok_or_else(|| cursor.error("data row is missing its date"))?;
        for &idnr in &idnrs {
            let tok = tokens
                .next()
                .ok_or_else(|| cursor.error("data row has fewer columns than the header"))?;
            let value = parse_f64(&cursor, tok, "series value")?;
            if let Some(max) = max_value {
                if !(0.0..=max).contains(&value) {
                    return Err(cursor.error(format!(
                        "value {} outside the plausible range [0, {}]",
                        value, max
                    )));
                }
            }
            series[idnr][t] = value;
        }
    }
    Ok(())
}
