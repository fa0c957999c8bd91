//! Full file pipeline: global config, topology, series and state files in,
//! simulation through, reports and state files out, and the written state
//! must re-parse to the same in-memory state.

use std::fs;
use std::path::PathBuf;

use riversim::analysis::reporting;
use riversim::analysis::summary::build_summary;
use riversim::config::global_config::GlobalConfig;
use riversim::core::river_system::RiverSystem;
use riversim::core::water_balance::{check_node_balances, global_balance};
use riversim::data::{dataset::Dataset, state, topology};
use riversim::models::node::NodeKind;

fn assert_approx(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() < tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

const TOPOLOGY: &str = "\
# Small two-branch system: reservoir, station, tailwater, ocean
NODE RESERVOIR 0 Upper
HRW 110.0
LRW 100.0
RES_PENALTY 500.0
# Level to volume [masl Mm3]
RESERVOIR_CURVE 3
95.0 0.0
100.0 20.0
112.0 140.0
# Level to spill [masl m3s]
OVERFLOW_CURVE 2 2
110.0 0.0
110.5 5000.0
OUTLET_HATCH -1
OUTLET_TUNNEL 1
OUTLET_AUTO_QMIN -9999
NODE PSTATION 1 Station
DOWNLINK_IDNR 2
TURBINE_CURVE 2
0.0 90.0
80.0 90.0
STATIC_GENERATOR_EFFICIENCY 0.98
HEADLOSSCOEF 0.0002
POWSTAT_MASL 20.0
POWSTAT_MIN_DISCHARGE 5.0
POWSTAT_MAX_DISCHARGE 80.0
POWSTAT_STARTSTOP 1000.0
LOCAL_ENERGY_EQUIVALENT 1.2
AUTO_QMIN -9999
MAX_ADJUST -1
NODE CHANNEL 2 Tailwater 3
TRAVELTIME 2
DECAY 0.5
QMIN 1
01.01 31.12 2.0 300.0
NODE CHANNEL 3 Ocean -1
TRAVELTIME 0
DECAY 1.0
QMIN 0
";

const START_STATE: &str = "\
NODE RESERVOIR 0 Upper 0.50
NODE PSTATION 1 Station 0.0
NODE CHANNEL 2 Tailwater
1000.0 2000.0
NODE CHANNEL 3 Ocean
";

fn write_inputs(dir: &PathBuf) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("topology.txt"), TOPOLOGY).unwrap();
    fs::write(dir.join("state.txt"), START_STATE).unwrap();

    let mut price = String::from("RESTPRICE 30.0\nDate Price\n");
    let mut inflow = String::from("Date_NodeID 0\n");
    let mut actions = String::from("Date_NodeID 1\n");
    for h in 0..24 {
        let stamp = format!("20230615{:02}", h);
        price.push_str(&format!("{} 40.0\n", stamp));
        inflow.push_str(&format!("{} 5.0\n", stamp));
        let action = if h < 12 { 1.0 } else { 0.0 };
        actions.push_str(&format!("{} {:.1}\n", stamp, action));
    }
    fs::write(dir.join("price.txt"), price).unwrap();
    fs::write(dir.join("inflow.txt"), inflow).unwrap();
    fs::write(dir.join("actions.txt"), actions).unwrap();

    let config = format!(
        "SYSTEMNAME demo\n\
         TOPOLOGYFILE topology.txt\n\
         ACTIONFILE actions.txt\n\
         PRICEFILE price.txt\n\
         INFLOWFILE inflow.txt\n\
         STARTSTATEFILE state.txt\n\
         OUTPUTFILE riversystem_demo_output.txt\n\
         OUTSTATEFILE outstate_demo.txt\n\
         INPUTDIR {}/\n\
         OUTPUTDIR {}/\n\
         DT 3600\n\
         WRITE_NODEFILES 1\n",
        dir.display(),
        dir.display()
    );
    fs::write(dir.join("config.txt"), config).unwrap();
}

#[test]
fn pipeline_runs_and_state_round_trips() {
    let dir = std::env::temp_dir().join("riversim_file_roundtrip");
    write_inputs(&dir);

    let gc = GlobalConfig::read(&dir.join("config.txt")).unwrap();
    assert_eq!(gc.systemname, "demo");
    assert_eq!(gc.dt, 3600);

    let mut builds = topology::load(&gc.topologyfile).unwrap();
    assert_eq!(builds.len(), 4);
    let data = Dataset::load(&gc, builds.len()).unwrap();
    assert_eq!(data.stps, 24);
    assert_approx(data.restprice, 30.0, 1e-12);

    state::apply_start_state(&gc.start_statefile, &mut builds).unwrap();

    let mut rs = RiverSystem::from_inputs(builds, &data, gc.dt as f64).unwrap();
    rs.simulate().unwrap();

    check_node_balances(&rs).unwrap();
    let balance = global_balance(&rs).unwrap();
    assert_approx(balance.waterbalance_mm3, 0.0, 1e-6);

    // The station ran at full discharge for 12 hours.
    let ps = &rs.nodes[1].scenario;
    assert!(ps.power_mwh[0] > 0.0);
    assert_approx(ps.tot_outflow[0], 80.0, 1e-9);
    assert_approx(ps.tot_outflow[23], 0.0, 1e-9);

    let summary = build_summary(&rs, &gc.systemname, data.restprice, &balance);
    assert!(summary.tot_income_eur > 0.0);
    // Start/stop transitions: one start at t=0, one stop at t=12.
    assert_approx(summary.sum_startstop_cost_eur, 1000.0, 1e-9);
    // The value function is realised profit plus the rest value.
    assert_approx(
        summary.value_function_eur,
        summary.tot_profit_eur + summary.remaining_available_mwh * 30.0,
        1e-6,
    );
    // Remaining energy prices the water parked above the station.
    assert_approx(
        summary.remaining_available_mwh,
        1.2 * rs.nodes[1].upstream_remaining_available_mm3 * 1000.0,
        1e-6,
    );

    // Write all the outputs and the end state.
    reporting::write_system_report(&gc.outputfile, &rs, &summary).unwrap();
    let out_state = gc.out_statefile.clone().unwrap();
    reporting::write_state_file(&out_state, &rs).unwrap();
    reporting::write_reservoir_matrix(&dir.join("reservoirs_demo_out.txt"), &rs).unwrap();
    reporting::write_node_files(&dir, &rs).unwrap();

    let report = fs::read_to_string(&gc.outputfile).unwrap();
    assert!(report.contains("GLOBAL WATERBALANCE"));
    assert!(report.contains("valuefunction_Euro"));

    // Reload the topology and apply the written end state: the parsed
    // values must match the final in-memory trajectory.
    let mut builds2 = topology::load(&gc.topologyfile).unwrap();
    state::apply_start_state(&out_state, &mut builds2).unwrap();

    let NodeKind::Reservoir(r2) = &builds2[0].kind else {
        panic!("node 0 should be a reservoir");
    };
    assert_approx(r2.init_fr, rs.nodes[0].scenario.res_fr[23], 1e-4);

    let NodeKind::Powerstation(p2) = &builds2[1].kind else {
        panic!("node 1 should be a powerstation");
    };
    assert_approx(p2.init_power_mwh, rs.nodes[1].scenario.power_mwh[23], 1e-4);

    let NodeKind::Channel(c2) = &builds2[2].kind else {
        panic!("node 2 should be a channel");
    };
    let NodeKind::Channel(c1) = &rs.nodes[2].kind else {
        panic!("node 2 should be a channel");
    };
    for (parsed, simulated) in c2.init_waterflow_m3.iter().zip(&c1.waterflow_m3) {
        assert_approx(*parsed, *simulated, 1e-4);
    }
}

#[test]
fn truncated_topology_is_rejected() {
    let dir = std::env::temp_dir().join("riversim_file_roundtrip_bad");
    fs::create_dir_all(&dir).unwrap();
    // The reservoir block stops in the middle of its curve.
    fs::write(
        dir.join("topology.txt"),
        "NODE RESERVOIR 0 Upper\nHRW 110.0\nLRW 100.0\nRES_PENALTY 500.0\nRESERVOIR_CURVE 3\n95.0 0.0\n",
    )
    .unwrap();
    assert!(topology::load(&dir.join("topology.txt")).is_err());
}

#[test]
fn state_for_wrong_node_name_is_rejected() {
    let dir = std::env::temp_dir().join("riversim_file_roundtrip_name");
    write_inputs(&dir);
    fs::write(
        dir.join("state_bad.txt"),
        "NODE RESERVOIR 0 WrongName 0.50\n",
    )
    .unwrap();
    let mut builds = topology::load(&dir.join("topology.txt")).unwrap();
    assert!(state::apply_start_state(&dir.join("state_bad.txt"), &mut builds).is_err());
}
