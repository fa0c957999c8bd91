use std::error::Error;
use std::path::Path;

use clap::Parser;
use tracing::info;

use riversim::analysis::reporting;
use riversim::analysis::summary::build_summary;
use riversim::cli::cli::Args;
use riversim::config::global_config::GlobalConfig;
use riversim::core::river_system::RiverSystem;
use riversim::core::water_balance;
use riversim::data::{dataset::Dataset, state, topology};
use riversim::models::node::NodeType;
use riversim::utils::logging;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init_logging(args.debug_logging(), args.quiet());

    if let Err(e) = run(Path::new(args.config())) {
        eprintln!("riversim: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let gc = GlobalConfig::read(config_path)?;

    let mut builds = topology::load(&gc.topologyfile)?;
    let data = Dataset::load(&gc, builds.len())?;
    state::apply_start_state(&gc.start_statefile, &mut builds)?;

    let nr_reservoirs = count_type(&builds, NodeType::Reservoir);
    let nr_pstations = count_type(&builds, NodeType::Powerstation);
    let nr_channels = count_type(&builds, NodeType::Channel);
    info!(
        system = %gc.systemname,
        nodes = builds.len(),
        reservoirs = nr_reservoirs,
        powerstations = nr_pstations,
        channels = nr_channels,
        dt = gc.dt,
        timesteps = data.stps,
        "river system loaded"
    );

    let mut rs = RiverSystem::from_inputs(builds, &data, gc.dt as f64)?;
    rs.simulate()?;

    water_balance::check_node_balances(&rs)?;
    let balance = water_balance::global_balance(&rs)?;
    info!(
        start_mm3 = balance.start_water_mm3,
        inflow_mm3 = balance.inflow_volume_mm3,
        outflow_mm3 = balance.outgoing_mm3,
        end_mm3 = balance.end_water_mm3,
        "global water balance verified"
    );

    let summary = build_summary(&rs, &gc.systemname, data.restprice, &balance);

    if !gc.outputdir.as_os_str().is_empty() {
        std::fs::create_dir_all(&gc.outputdir)?;
    }
    reporting::write_system_report(&gc.outputfile, &rs, &summary)?;

    let json_path = gc
        .outputdir
        .join(format!("riversystem_{}_summary.json", gc.systemname));
    reporting::write_summary_json(&json_path, &summary)?;

    let matrix_path = gc
        .outputdir
        .join(format!("reservoirs_{}_out.txt", gc.systemname));
    reporting::write_reservoir_matrix(&matrix_path, &rs)?;

    if let Some(out_statefile) = &gc.out_statefile {
        reporting::write_state_file(out_statefile, &rs)?;
    }

    if gc.write_nodefiles {
        reporting::write_node_files(&gc.outputdir, &rs)?;
    }

    println!("ValueFunction = {:.5}", summary.value_function_eur);
    Ok(())
}

fn count_type(builds: &[topology::NodeBuild], node_type: NodeType) -> usize {
    builds
        .iter()
        .filter(|b| b.kind.node_type() == node_type)
        .count()
}
