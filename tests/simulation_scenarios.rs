//! End-to-end behaviour scenarios for the simulation kernel: penalties,
//! production economics and the action response.

use riversim::core::river_system::RiverSystem;
use riversim::core::water_balance::{check_node_balances, global_balance};
use riversim::models::channel::Channel;
use riversim::models::node::{Node, NodeKind};
use riversim::models::powerstation::Powerstation;
use riversim::models::qmin::{QminPeriod, QminSchedule};
use riversim::models::reservoir::{AutoQminOutlet, HatchOutlet, Reservoir};
use riversim::models::scenario::Scenario;

const DT: f64 = 3600.0;

fn assert_approx(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() < tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

fn scenario_with_dates(stps: usize) -> Scenario {
    let mut s = Scenario::new(stps, DT);
    for t in 0..stps {
        s.year[t] = 2023;
        s.month[t] = 6;
        s.day[t] = 15 + (t / 24) as u32;
        s.hour[t] = (t % 24) as u32;
    }
    s
}

fn test_reservoir(overflow_downstream: usize) -> Reservoir {
    Reservoir::new(
        110.0,
        100.0,
        500.0,
        &[(95.0, 0.0), (100.0, 20.0), (112.0, 140.0)],
        &[(110.0, 0.0), (110.5, 5000.0)],
        overflow_downstream,
    )
    .unwrap()
}

fn flat_station() -> Powerstation {
    Powerstation::new(
        &[(0.0, 90.0), (80.0, 90.0)],
        1.0,
        0.0,
        20.0,
        5.0,
        80.0,
        1000.0,
        1.2,
        0.0,
    )
    .unwrap()
}

fn outfall_node(idnr: usize, stps: usize) -> Node {
    Node::new(
        idnr,
        "outfall".to_string(),
        None,
        scenario_with_dates(stps),
        NodeKind::Channel(Channel::new(0, 1.0)),
    )
}

#[test]
fn forced_hatch_release_breaks_lrw_and_accrues_penalty() {
    let stps = 6;
    let mut reservoir = test_reservoir(1);
    reservoir.init_fr = 0.0; // exactly at LRW
    reservoir.hatch = Some(HatchOutlet {
        downstream: 1,
        min_q_m3s: 1.0,
        max_q_m3s: 1.0,
        hatch_masl: 96.0, // the gate sits below LRW, so it keeps draining
    });

    let res = Node::new(
        0,
        "upper".to_string(),
        Some(1),
        scenario_with_dates(stps),
        NodeKind::Reservoir(reservoir),
    );
    let outfall = outfall_node(1, stps);

    let mut rs = RiverSystem::new(vec![res, outfall], DT, stps).unwrap();
    rs.simulate().unwrap();

    let s = &rs.nodes[0].scenario;
    for t in 0..stps {
        // One hour of forced release per step, penalty charged as soon as
        // the level is below LRW.
        assert_approx(s.hatchflow_m3s[t], 1.0, 1e-9);
        assert_approx(s.cost[t], 500.0, 1e-9);
        assert!(s.res_fr[t] < 0.0);
        assert!(s.res_fr[t] > -1.0);
    }

    check_node_balances(&rs).unwrap();
    global_balance(&rs).unwrap();
}

#[test]
fn tunnel_flow_is_monotone_in_the_action() {
    let stps = 20;
    let mut reservoir = test_reservoir(2);
    reservoir.init_fr = 0.9; // plenty of storage, head stays near constant
    reservoir.tunnel_downstream = Some(1);

    let res = Node::new(
        0,
        "upper".to_string(),
        Some(1),
        scenario_with_dates(stps),
        NodeKind::Reservoir(reservoir),
    );

    let mut ps = Node::new(
        1,
        "station".to_string(),
        Some(2),
        scenario_with_dates(stps),
        NodeKind::Powerstation(flat_station()),
    );
    for t in 0..stps {
        // Ramp the action up through [0.01, 1.0].
        ps.scenario.action[t] = 0.01 + 0.99 * t as f64 / (stps - 1) as f64;
        ps.scenario.price[t] = 50.0;
    }

    let outfall = outfall_node(2, stps);

    let mut rs = RiverSystem::new(vec![res, ps, outfall], DT, stps).unwrap();
    rs.simulate().unwrap();

    let flows = &rs.nodes[0].scenario.tunnelflow_m3s;
    for t in 1..stps {
        assert!(
            flows[t] >= flows[t - 1] - 1e-9,
            "tunnel flow decreased: {} -> {} at t={}",
            flows[t - 1],
            flows[t],
            t
        );
    }
    assert!(flows[stps - 1] > flows[0]);
}

#[test]
fn auto_qmin_release_charges_nothing_at_the_reservoir() {
    let stps = 24;
    let mut reservoir = test_reservoir(1);
    reservoir.init_fr = 0.5;
    reservoir.auto_qmin = Some(AutoQminOutlet {
        downstream: 1,
        schedule: QminSchedule::new(vec![QminPeriod::new(1, 1, 31, 12, 4.0, 0.0).unwrap()]),
    });

    let res = Node::new(
        0,
        "upper".to_string(),
        Some(1),
        scenario_with_dates(stps),
        NodeKind::Reservoir(reservoir),
    );
    let outfall = outfall_node(1, stps);

    let mut rs = RiverSystem::new(vec![res, outfall], DT, stps).unwrap();
    rs.simulate().unwrap();

    let s = &rs.nodes[0].scenario;
    for t in 0..stps {
        assert_approx(s.auto_qmin_m3s[t], 4.0, 1e-9);
        // The release itself is free; only a receiving channel with a qmin
        // schedule of its own charges for shortfalls.
        assert_approx(s.cost[t], 0.0, 1e-9);
        assert_approx(rs.nodes[1].scenario.tot_outflow[t], 4.0, 1e-9);
    }

    check_node_balances(&rs).unwrap();
    global_balance(&rs).unwrap();
}

#[test]
fn channel_qmin_penalty_is_charged_where_observed() {
    let stps = 12;
    let mut reservoir = test_reservoir(1);
    reservoir.init_fr = 0.5;
    reservoir.hatch = Some(HatchOutlet {
        downstream: 1,
        min_q_m3s: 1.0,
        max_q_m3s: 10.0,
        hatch_masl: 96.0,
    });

    let mut res = Node::new(
        0,
        "upper".to_string(),
        Some(1),
        scenario_with_dates(stps),
        NodeKind::Reservoir(reservoir),
    );
    for t in 0..stps {
        // Half the horizon satisfies the requirement, half violates it.
        res.scenario.action[t] = if t < 6 { 1.0 } else { 0.0 };
    }

    let mut channel = Channel::new(0, 1.0);
    channel.qmin = Some(QminSchedule::new(vec![QminPeriod::new(
        1, 1, 31, 12, 5.0, 240.0,
    )
    .unwrap()]));
    let ch = Node::new(
        1,
        "creek".to_string(),
        None,
        scenario_with_dates(stps),
        NodeKind::Channel(channel),
    );

    let mut rs = RiverSystem::new(vec![res, ch], DT, stps).unwrap();
    rs.simulate().unwrap();

    let s = &rs.nodes[1].scenario;
    for t in 0..stps {
        if t < 6 {
            // 10 m3/s satisfies the 5 m3/s requirement.
            assert_approx(s.cost[t], 0.0, 1e-9);
        } else {
            // 1 m3/s falls short, one hour of penalty per step.
            assert_approx(s.cost[t], 240.0, 1e-9);
        }
    }
}

#[test]
fn daily_adjustment_limit_charges_on_the_closing_step() {
    let stps = 48; // two calendar days
    let mut reservoir = test_reservoir(2);
    reservoir.init_fr = 0.9;
    reservoir.tunnel_downstream = Some(1);

    let res = Node::new(
        0,
        "upper".to_string(),
        Some(1),
        scenario_with_dates(stps),
        NodeKind::Reservoir(reservoir),
    );

    let mut station = flat_station();
    station.startstop_cost = 0.0;
    station.max_adjustment_pr_day = 2;
    station.max_adjustment_cost = 5000.0;
    let mut ps = Node::new(
        1,
        "station".to_string(),
        Some(2),
        scenario_with_dates(stps),
        NodeKind::Powerstation(station),
    );
    for t in 0..stps {
        // Day one toggles every other hour, day two holds steady.
        ps.scenario.action[t] = if t < 24 {
            if t % 2 == 0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0
        };
        ps.scenario.price[t] = 45.0;
    }

    let outfall = outfall_node(2, stps);

    let mut rs = RiverSystem::new(vec![res, ps, outfall], DT, stps).unwrap();
    rs.simulate().unwrap();

    let s = &rs.nodes[1].scenario;
    assert_approx(s.adjust_cost[23], 5000.0, 1e-9);
    let day_two_adjust: f64 = s.adjust_cost[24..].iter().sum();
    assert_approx(day_two_adjust, 0.0, 1e-9);
}

#[test]
fn production_income_follows_price() {
    let stps = 8;
    let mut reservoir = test_reservoir(2);
    reservoir.init_fr = 0.9;
    reservoir.tunnel_downstream = Some(1);

    let res = Node::new(
        0,
        "upper".to_string(),
        Some(1),
        scenario_with_dates(stps),
        NodeKind::Reservoir(reservoir),
    );
    let mut station = flat_station();
    station.startstop_cost = 0.0;
    let mut ps = Node::new(
        1,
        "station".to_string(),
        Some(2),
        scenario_with_dates(stps),
        NodeKind::Powerstation(station),
    );
    for t in 0..stps {
        ps.scenario.action[t] = 1.0;
        ps.scenario.price[t] = 10.0 * (t + 1) as f64;
    }
    let outfall = outfall_node(2, stps);

    let mut rs = RiverSystem::new(vec![res, ps, outfall], DT, stps).unwrap();
    rs.simulate().unwrap();

    let s = &rs.nodes[1].scenario;
    for t in 0..stps {
        assert!(s.power_mwh[t] > 0.0);
        assert_approx(s.income[t], s.power_mwh[t] * s.price[t], 1e-9);
    }
    // Identical discharge and near-identical head: income scales with price.
    assert!(s.income[stps - 1] > s.income[0] * 7.0);
}
