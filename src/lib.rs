pub mod catalog;
pub mod core;
pub mod errors;
pub mod input;
pub mod output;
pub mod statistics;

#[cfg(test)]
mod tests;

use crate::catalog::EnvelopeCatalog;
use crate::core::space_heat_demand::envelope::BuildingEnvelope;
use crate::core::space_heat_demand::zone::{SimulationResults, ThermalNetwork};
use crate::input::{ingest_for_processing, EnvelopeInput, ProjectInput};
use crate::output::Output;
use crate::statistics::SimulationSummary;
use anyhow::bail;
use csv::WriterBuilder;
use std::io::Read;
use tracing::info;

/// Run a project read from JSON: derive the envelope, simulate the whole horizon and write the
/// `results` and `results_summary` files to `output`.
///
/// A catalog is only needed when the building is taken from one.
pub fn run_project(
    input: impl Read,
    catalog: Option<&dyn EnvelopeCatalog>,
    output: impl Output,
) -> Result<SimulationSummary, anyhow::Error> {
    let input = ingest_for_processing(input)?;

    let envelope = envelope_from_input(&input, catalog)?;
    info!(
        "Simulating {} timesteps for a {} m2 building",
        input.simulation.t_outside.len(),
        envelope.floor_area()
    );

    let results = ThermalNetwork::new(&envelope).simulate(&input.simulation)?;
    let summary = SimulationSummary::from_results(&results);

    if !output.is_noop() {
        write_core_output_file(&output, "results", &results)?;
        write_summary_output_file(&output, "results_summary", &envelope, &summary)?;
    }
    info!("Run finished");

    Ok(summary)
}

pub fn envelope_from_input(
    input: &ProjectInput,
    catalog: Option<&dyn EnvelopeCatalog>,
) -> Result<BuildingEnvelope, anyhow::Error> {
    let envelope = match &input.building {
        EnvelopeInput::Parameters(parameters) => {
            BuildingEnvelope::from_parameters(parameters.clone(), input.class_building)?
        }
        building => {
            let Some((query, floor_area)) = building.catalog_query() else {
                bail!("Building input does not describe an envelope");
            };
            let Some(catalog) = catalog else {
                bail!("The building is taken from a catalog but no catalog was provided");
            };
            BuildingEnvelope::from_catalog(catalog, &query, input.class_building, floor_area)?
        }
    };

    Ok(envelope)
}

const RESULTS_COLUMNS: [(&str, &str); 10] = [
    ("Timestep", "[count]"),
    ("Internal air temp", "[deg C]"),
    ("Operative temp", "[deg C]"),
    ("Mass temp", "[deg C]"),
    ("Surface temp", "[deg C]"),
    ("Operating mode", "[mode]"),
    ("Space heat demand", "[W]"),
    ("Space cool demand", "[W]"),
    ("Unmet heat demand", "[W]"),
    ("Unmet cool demand", "[W]"),
];

fn write_core_output_file(
    output: &impl Output,
    output_key: &str,
    results: &SimulationResults,
) -> Result<(), anyhow::Error> {
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    // Write headings and units to output file
    writer.write_record(RESULTS_COLUMNS.iter().map(|(heading, _)| heading))?;
    writer.write_record(RESULTS_COLUMNS.iter().map(|(_, unit)| unit))?;

    for t_idx in 0..results.len() {
        writer.write_record([
            t_idx.to_string(),
            results.t_air[t_idx].to_string(),
            results.t_operative[t_idx].to_string(),
            results.t_m[t_idx].to_string(),
            results.t_s[t_idx].to_string(),
            results.mode[t_idx].to_string(),
            results.heating_demand[t_idx].to_string(),
            results.cooling_demand[t_idx].to_string(),
            results.unmet_heating[t_idx].to_string(),
            results.unmet_cooling[t_idx].to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

fn write_summary_output_file(
    output: &impl Output,
    output_key: &str,
    envelope: &BuildingEnvelope,
    summary: &SimulationSummary,
) -> Result<(), anyhow::Error> {
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    let mut rows: Vec<(&str, String, &str)> = vec![
        ("Floor area", envelope.floor_area().to_string(), "[m2]"),
        ("Building class", envelope.class_building().to_string(), ""),
        ("h_tr_em", envelope.h_tr_em().to_string(), "[W/K]"),
        ("h_tr_w", envelope.h_tr_w().to_string(), "[W/K]"),
        ("h_ve", envelope.h_ve().to_string(), "[W/K]"),
        ("h_tr_is", envelope.h_tr_is().to_string(), "[W/K]"),
        ("h_tr_ms", envelope.h_tr_ms().to_string(), "[W/K]"),
        ("c_m", envelope.c_m().to_string(), "[J/K]"),
    ];
    if let Some(reference) = envelope.catalog_reference() {
        rows.push(("Catalog building", reference.code.clone(), ""));
        rows.push((
            "Catalog h_transmission",
            reference.h_transmission.to_string(),
            "[W/K]",
        ));
        rows.push((
            "Catalog heating demand",
            reference.q_heating_demand_annual.to_string(),
            "[kWh]",
        ));
    }
    rows.extend([
        ("Heating energy", summary.heating_energy.to_string(), "[kWh]"),
        ("Cooling energy", summary.cooling_energy.to_string(), "[kWh]"),
        (
            "Peak heating power",
            summary.peak_heating_power.to_string(),
            "[W]",
        ),
        (
            "Peak cooling power",
            summary.peak_cooling_power.to_string(),
            "[W]",
        ),
        (
            "Unmet demand timesteps",
            summary.unmet_demand_steps.to_string(),
            "[count]",
        ),
        (
            "Excess degree hours",
            summary.excess_degree_hours.to_string(),
            "[K.h]",
        ),
        (
            "Internal air temp 5th percentile",
            summary.t_air_percentile_5.to_string(),
            "[deg C]",
        ),
        (
            "Internal air temp 95th percentile",
            summary.t_air_percentile_95.to_string(),
            "[deg C]",
        ),
    ]);

    for (name, value, unit) in rows {
        writer.write_record([name, value.as_str(), unit])?;
    }

    writer.flush()?;

    Ok(())
}
