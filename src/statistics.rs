//! Post-run summaries of a simulation, such as energy totals and percentiles of the air temperature.
use crate::core::space_heat_demand::zone::SimulationResults;
use crate::core::units::watts_over_hour_to_kwh;
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics};

/// Upper limit of the operative temperature used for summer overheating assessments
/// (DIN 4108-2), in deg C
pub const OVERHEATING_BOUNDARY_TEMPERATURE: f64 = 26.;

pub fn percentile(numbers: &[f64], percentile: usize) -> f64 {
    let numbers = numbers.to_vec();
    let mut data = Data::new(numbers);

    data.percentile(percentile)
}

/// Sum of the hourly exceedances of `boundary`, in K.h
pub fn excess_temperature_degree_hours(temperatures: &[f64], boundary: f64) -> f64 {
    temperatures
        .iter()
        .map(|temperature| (temperature - boundary).max(0.))
        .sum()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationSummary {
    /// in kWh
    pub heating_energy: f64,
    /// in kWh
    pub cooling_energy: f64,
    /// in W
    pub peak_heating_power: f64,
    /// in W
    pub peak_cooling_power: f64,
    pub unmet_demand_steps: usize,
    /// in K.h above [`OVERHEATING_BOUNDARY_TEMPERATURE`]
    pub excess_degree_hours: f64,
    pub t_air_percentile_5: f64,
    pub t_air_percentile_95: f64,
}

impl SimulationSummary {
    pub fn from_results(results: &SimulationResults) -> Self {
        let energy = |series: &[f64]| {
            series
                .iter()
                .copied()
                .map(watts_over_hour_to_kwh)
                .sum::<f64>()
        };
        let peak = |series: &[f64]| series.iter().copied().fold(0., f64::max);

        Self {
            heating_energy: energy(&results.heating_demand),
            cooling_energy: energy(&results.cooling_demand),
            peak_heating_power: peak(&results.heating_demand),
            peak_cooling_power: peak(&results.cooling_demand),
            unmet_demand_steps: results.unmet_steps(),
            excess_degree_hours: excess_temperature_degree_hours(
                &results.t_air,
                OVERHEATING_BOUNDARY_TEMPERATURE,
            ),
            t_air_percentile_5: percentile(&results.t_air, 5),
            t_air_percentile_95: percentile(&results.t_air, 95),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space_heat_demand::zone::OperatingMode;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn numbers() -> [f64; 10] {
        [9.0, 3.0, 3.0, 4.0, 5.0, 4.9, 8.0, 3.3, 2.0, 0.1]
    }

    #[fixture]
    fn results() -> SimulationResults {
        SimulationResults {
            heating_demand: vec![0., 1_500., 500., 0.],
            cooling_demand: vec![0., 0., 0., 2_000.],
            t_air: vec![24., 19., 20., 28.5],
            t_operative: vec![24., 19.5, 20.5, 28.],
            t_m: vec![23., 20., 20., 27.],
            t_s: vec![24., 19.7, 20.7, 27.8],
            unmet_heating: vec![0., 250., 0., 0.],
            unmet_cooling: vec![0., 0., 0., 100.],
            mode: vec![
                OperatingMode::NoLoad,
                OperatingMode::Heating,
                OperatingMode::Heating,
                OperatingMode::Cooling,
            ],
        }
    }

    #[rstest]
    fn test_percentile(numbers: [f64; 10]) {
        assert_relative_eq!(percentile(&numbers, 50), 3.65, max_relative = 1e-9);
        assert!(percentile(&numbers, 5) <= percentile(&numbers, 95));
    }

    #[rstest]
    fn should_only_count_hours_above_boundary() {
        assert_relative_eq!(
            excess_temperature_degree_hours(&[25., 26., 27.5, 30., 18.], 26.),
            5.5
        );
        assert_eq!(excess_temperature_degree_hours(&[], 26.), 0.);
    }

    #[rstest]
    fn should_summarise_results(results: SimulationResults) {
        let summary = SimulationSummary::from_results(&results);

        assert_relative_eq!(summary.heating_energy, 2.);
        assert_relative_eq!(summary.cooling_energy, 2.);
        assert_eq!(summary.peak_heating_power, 1_500.);
        assert_eq!(summary.peak_cooling_power, 2_000.);
        assert_eq!(summary.unmet_demand_steps, 2);
        assert_relative_eq!(summary.excess_degree_hours, 2.5);
        assert!(summary.t_air_percentile_5 >= 19.);
        assert!(summary.t_air_percentile_95 <= 28.5);
    }
}
