use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::summary::SystemSummary;
use crate::core::river_system::RiverSystem;
use crate::models::node::NodeKind;

/// Write the aggregated system report: per-node end water, the global
/// water balance and the economic totals.
pub fn write_system_report(
    path: &Path,
    rs: &RiverSystem,
    summary: &SystemSummary,
) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);

    writeln!(w, "Riversystem {}", summary.systemname)?;
    writeln!(w, "Node Idnr Nodename          Nodetype Remaining_Mm3")?;
    for node in &rs.nodes {
        writeln!(
            w,
            "Node {:2} {:<20} {:<10} {:.4}",
            node.idnr,
            node.name,
            node.kind.node_type().as_str(),
            node.end_water_mm3()
        )?;
    }

    writeln!(w, "-------------------------------------------")?;
    writeln!(w, "GLOBAL WATERBALANCE")?;
    writeln!(w, "start_water_Mm3   = {:.6}", summary.start_water_mm3)?;
    writeln!(w, "inflow_volume_Mm3 = {:.6}", summary.inflow_volume_mm3)?;
    writeln!(w, "outflow_Mm3       = {:.6}", summary.outgoing_mm3)?;
    writeln!(w, "end_water_Mm3     = {:.6}", summary.end_water_mm3)?;
    writeln!(w, "waterbalance      = {:.6}", summary.waterbalance_mm3)?;
    writeln!(w, "Note that there might be dead water below LRW in the system")?;
    writeln!(w, "-------------------------------------------")?;

    writeln!(w, "Average_price_Euro           = {:.3}", summary.avg_price_eur_mwh)?;
    writeln!(w, "RestPrice_Euro               = {:.3}", summary.restprice_eur_mwh)?;
    writeln!(w, "tot_remaining_available_Mm3  = {:.3}", summary.remaining_available_mm3)?;
    writeln!(w, "tot_remaining_available_MWh  = {:.3}", summary.remaining_available_mwh)?;
    writeln!(w, "tot_remaining_available_Euro = {:.3}", summary.remaining_available_eur)?;
    writeln!(w, "Sum_Production_MWh           = {:.3}", summary.sum_production_mwh)?;
    writeln!(w, "tot_income_Euro              = {:.3}", summary.tot_income_eur)?;
    writeln!(w, "Avg_achieved_price_E_MWh     = {:.3}", summary.avg_achieved_price_eur_mwh)?;
    writeln!(w, "sum_qmin_cost_Euro           = {:.3}", summary.sum_qmin_cost_eur)?;
    writeln!(w, "sum_lrw_cost_Euro            = {:.3}", summary.sum_lrw_cost_eur)?;
    writeln!(w, "sum_startstopcost_Euro       = {:.3}", summary.sum_startstop_cost_eur)?;
    writeln!(w, "sum_max_adjustment_cost      = {:.3}", summary.sum_adjustment_cost_eur)?;
    writeln!(w, "tot_cost_Euro                = {:.3}", summary.tot_cost_eur)?;
    writeln!(w, "tot_profit_Euro              = {:.3}", summary.tot_profit_eur)?;
    writeln!(w, "valuefunction_Euro           = {:.3}", summary.value_function_eur)?;

    w.flush()
}

/// Machine-readable twin of the system report.
pub fn write_summary_json(path: &Path, summary: &SystemSummary) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, summary)?;
    writeln!(w)?;
    w.flush()
}

/// Matrix of reservoir fill fractions over time, one column per reservoir.
pub fn write_reservoir_matrix(path: &Path, rs: &RiverSystem) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);

    writeln!(w, "Riversystem reservoir fractions [fr]")?;
    write!(w, "YYYY MM DD HH ")?;
    for node in rs.reservoirs() {
        write!(w, "{} ", node.name)?;
    }
    writeln!(w)?;

    if let Some(first) = rs.nodes.first() {
        for t in 0..rs.stps {
            let s = &first.scenario;
            write!(w, "{} {} {} {} ", s.year[t], s.month[t], s.day[t], s.hour[t])?;
            for node in rs.reservoirs() {
                write!(w, "{:.4} ", node.scenario.res_fr[t])?;
            }
            writeln!(w)?;
        }
    }
    w.flush()
}

/// One trajectory file per node, named node<id>_<name>.txt.
pub fn write_node_files(outputdir: &Path, rs: &RiverSystem) -> io::Result<()> {
    for node in &rs.nodes {
        let path = outputdir.join(format!("node{}_{}.txt", node.idnr, node.name));
        let mut w = BufWriter::new(File::create(path)?);
        let s = &node.scenario;

        match &node.kind {
            NodeKind::Reservoir(r) => {
                writeln!(w, "RESERVOIR node {} {}", node.idnr, node.name)?;
                writeln!(w, "reservoir_init_fr= {:.5}", r.init_fr)?;
                writeln!(w, "sum_local_inflow_Mm3= {:.5}", s.sum_local_inflow_mm3)?;
                writeln!(
                    w,
                    "yyyy mm dd hh Inflow Price Action Up_Inflow Res_Mm3 Res_masl Res_fr lrw_cost tunnelflow hatchflow overflow auto_qmin tot_outflow"
                )?;
                for t in 0..rs.stps {
                    writeln!(
                        w,
                        "{} {} {} {} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4}",
                        s.year[t], s.month[t], s.day[t], s.hour[t],
                        s.inflow[t], s.price[t], s.action[t],
                        s.up_inflow[t],
                        s.res_mm3[t], s.res_masl[t], s.res_fr[t],
                        s.cost[t],
                        s.tunnelflow_m3s[t], s.hatchflow_m3s[t],
                        s.overflow_m3s[t], s.auto_qmin_m3s[t],
                        s.tot_outflow[t]
                    )?;
                }
            }
            NodeKind::Powerstation(p) => {
                writeln!(w, "POWERSTATION node {} {}", node.idnr, node.name)?;
                writeln!(w, "init_Power = {:.5}", p.init_power_mwh)?;
                writeln!(
                    w,
                    "yyyy mm dd hh Up_Inflow Price Action tot_outflow auto_qmin income startstopCost Hnetto Hbrutto Power adjust_cost"
                )?;
                for t in 0..rs.stps {
                    writeln!(
                        w,
                        "{} {} {} {} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4}",
                        s.year[t], s.month[t], s.day[t], s.hour[t],
                        s.up_inflow[t], s.price[t], s.action[t],
                        s.tot_outflow[t], s.auto_qmin_m3s[t],
                        s.income[t], s.cost[t] - s.adjust_cost[t],
                        s.h_netto[t], s.h_brutto[t],
                        s.power_mwh[t], s.adjust_cost[t]
                    )?;
                }
            }
            NodeKind::Channel(c) => {
                writeln!(w, "CHANNEL node {} {}", node.idnr, node.name)?;
                writeln!(w, "TRAVELTIME= {}", c.traveltime)?;
                writeln!(w, "DECAY= {:.3}", c.decay)?;
                writeln!(w, "yyyy mm dd hh Up_Inflow Storage_Mm3 tot_outflow Qmin_Cost")?;
                for t in 0..rs.stps {
                    writeln!(
                        w,
                        "{} {} {} {} {:.4} {:.8} {:.4} {:.4}",
                        s.year[t], s.month[t], s.day[t], s.hour[t],
                        s.up_inflow[t], s.channel_storage_mm3[t],
                        s.tot_outflow[t], s.cost[t]
                    )?;
                }
            }
        }
        w.flush()?;
    }
    Ok(())
}

/// Write the end-of-horizon state in the start-state format, so a follow-up
/// run can continue where this one stopped.
pub fn write_state_file(path: &Path, rs: &RiverSystem) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);

    for node in &rs.nodes {
        let s = &node.scenario;
        let last = rs.stps.saturating_sub(1);
        match &node.kind {
            NodeKind::Reservoir(r) => {
                // With zero timesteps the initial fraction is still current.
                let fr = if rs.stps > 0 { s.res_fr[last] } else { r.init_fr };
                writeln!(w, "NODE RESERVOIR {} {} {:.5}", node.idnr, node.name, fr)?;
            }
            NodeKind::Powerstation(p) => {
                let power = if rs.stps > 0 {
                    s.power_mwh[last]
                } else {
                    p.init_power_mwh
                };
                writeln!(w, "NODE PSTATION {} {} {:.5}", node.idnr, node.name, power)?;
            }
            NodeKind::Channel(c) => {
                writeln!(w, "NODE CHANNEL {} {}", node.idnr, node.name)?;
                if c.traveltime > 0 {
                    let cells: Vec<String> =
                        c.waterflow_m3.iter().map(|v| format!("{:.5}", v)).collect();
                    writeln!(w, "{}", cells.join(" "))?;
                }
            }
        }
    }
    w.flush()
}
