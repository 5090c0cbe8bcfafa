use crate::catalog::{CatalogCriteria, CatalogQuery, Refurbishment};
use crate::core::space_heat_demand::building_parameters::BuildingParameters;
use crate::core::space_heat_demand::envelope::BuildingClass;
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read};

/// Smallest permitted gap between the heating override and the base heating setpoint, in K
pub const MINIMUM_HEATING_OVERRIDE_MARGIN: f64 = 0.2;

pub fn ingest_for_processing(json: impl Read) -> Result<ProjectInput, anyhow::Error> {
    let reader = BufReader::new(json);

    let input: ProjectInput = serde_json::from_reader(reader)?;

    Ok(input)
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectInput {
    pub building: EnvelopeInput,
    #[serde(default)]
    pub class_building: BuildingClass,
    pub simulation: SimulationInput,
}

/// Where the envelope of the building comes from.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EnvelopeInput {
    TabulaCode {
        code: String,
        #[serde(default)]
        floor_area: Option<f64>,
    },
    TabulaSelection {
        country: String,
        building_type: String,
        construction_year: i32,
        #[serde(default)]
        refurbishment: Option<Refurbishment>,
        #[serde(default)]
        floor_area: Option<f64>,
    },
    Parameters(BuildingParameters),
}

impl EnvelopeInput {
    /// Catalog lookup and requested floor area, for envelopes taken from a catalog.
    pub fn catalog_query(&self) -> Option<(CatalogQuery, Option<f64>)> {
        match self {
            EnvelopeInput::TabulaCode { code, floor_area } => {
                Some((CatalogQuery::Code(code.clone()), *floor_area))
            }
            EnvelopeInput::TabulaSelection {
                country,
                building_type,
                construction_year,
                refurbishment,
                floor_area,
            } => Some((
                CatalogQuery::Criteria(CatalogCriteria {
                    country: country.clone(),
                    building_type: building_type.clone(),
                    construction_year: *construction_year,
                    refurbishment: *refurbishment,
                }),
                *floor_area,
            )),
            EnvelopeInput::Parameters(_) => None,
        }
    }
}

/// A value that is either fixed for the whole run or given per timestep.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Schedule {
    Constant(f64),
    Series(Vec<f64>),
}

impl Schedule {
    /// Value at `timestep`. Series are expected to have been checked against the run horizon.
    pub fn value_at(&self, timestep: usize) -> f64 {
        match self {
            Schedule::Constant(value) => *value,
            Schedule::Series(values) => values[timestep],
        }
    }

    pub fn min(&self) -> f64 {
        match self {
            Schedule::Constant(value) => *value,
            Schedule::Series(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            Schedule::Constant(value) => *value,
            Schedule::Series(values) => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    fn check_length(&self, name: &'static str, horizon: usize) -> Result<(), ConfigurationError> {
        match self {
            Schedule::Series(values) if values.is_empty() => {
                Err(ConfigurationError::EmptyInputSeries(name))
            }
            Schedule::Series(values) if values.len() != horizon => {
                Err(ConfigurationError::SeriesLengthMismatch {
                    name,
                    expected: horizon,
                    actual: values.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl From<f64> for Schedule {
    fn from(value: f64) -> Self {
        Schedule::Constant(value)
    }
}

impl From<Vec<f64>> for Schedule {
    fn from(values: Vec<f64>) -> Self {
        Schedule::Series(values)
    }
}

/// What to do when the conditioning device cannot reach the setpoint.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmetDemandPolicy {
    /// Clamp to the device limit and record the shortfall
    #[default]
    Report,
    /// Stop the run at the first timestep the device cannot satisfy
    Fail,
}

fn default_t_m_init() -> f64 {
    20.
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationInput {
    /// outdoor air temperature per timestep, in deg C; sets the run horizon
    pub t_outside: Vec<f64>,
    /// solar gains, in W
    pub solar_gains: Schedule,
    /// internal gains, in W
    pub internal_gains: Schedule,
    /// in deg C
    pub t_set_heating: Schedule,
    /// in deg C
    pub t_set_cooling: Schedule,
    /// upper heating comfort band, in deg C
    #[serde(default)]
    pub t_set_heating_max: Option<Schedule>,
    /// in W
    pub max_power_heating: f64,
    /// in W, given as a positive number
    pub max_power_cooling: f64,
    /// initial temperature of the thermal mass, in deg C
    #[serde(default = "default_t_m_init")]
    pub t_m_init: f64,
    /// air temperature forced at the first timestep, in deg C
    #[serde(default)]
    pub t_air_init: Option<f64>,
    #[serde(default)]
    pub unmet_demand_policy: UnmetDemandPolicy,
}

impl SimulationInput {
    /// Check the inputs are consistent and return the number of timesteps to simulate.
    pub fn validate(&self) -> Result<usize, ConfigurationError> {
        let horizon = self.t_outside.len();
        if horizon == 0 {
            return Err(ConfigurationError::EmptyInputSeries("t_outside"));
        }

        for (name, schedule) in [
            ("solar_gains", Some(&self.solar_gains)),
            ("internal_gains", Some(&self.internal_gains)),
            ("t_set_heating", Some(&self.t_set_heating)),
            ("t_set_cooling", Some(&self.t_set_cooling)),
            ("t_set_heating_max", self.t_set_heating_max.as_ref()),
        ] {
            if let Some(schedule) = schedule {
                schedule.check_length(name, horizon)?;
            }
        }

        if let Some(timestep) = (0..horizon).find(|&t| {
            self.t_set_cooling.value_at(t) < self.t_set_heating.value_at(t)
        }) {
            return Err(ConfigurationError::CoolingSetpointBelowHeating(timestep));
        }

        if let Some(t_set_heating_max) = &self.t_set_heating_max {
            let minimum_override = t_set_heating_max.min();
            let maximum_heating = self.t_set_heating.max();
            if minimum_override <= maximum_heating {
                return Err(ConfigurationError::HeatingOverrideNotAbove {
                    minimum_override,
                    maximum_heating,
                });
            }
            let margin = minimum_override - maximum_heating;
            if margin < MINIMUM_HEATING_OVERRIDE_MARGIN {
                return Err(ConfigurationError::HeatingOverrideMarginTooSmall {
                    margin,
                    minimum: MINIMUM_HEATING_OVERRIDE_MARGIN,
                });
            }
        }

        for (name, power) in [
            ("heating", self.max_power_heating),
            ("cooling", self.max_power_cooling),
        ] {
            if power.is_nan() || power < 0. {
                return Err(ConfigurationError::NegativeDevicePower(name));
            }
        }

        Ok(horizon)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    #[fixture]
    pub(crate) fn simulation_input() -> SimulationInput {
        SimulationInput {
            t_outside: vec![10.; 10],
            solar_gains: 100.0.into(),
            internal_gains: 100.0.into(),
            t_set_heating: 20.0.into(),
            t_set_cooling: 30.0.into(),
            t_set_heating_max: None,
            max_power_heating: 10_000.,
            max_power_cooling: 10_000.,
            t_m_init: 26.,
            t_air_init: None,
            unmet_demand_policy: UnmetDemandPolicy::Report,
        }
    }

    #[rstest]
    fn should_build_schedules_from_numbers(simulation_input: SimulationInput) {
        assert_eq!(Schedule::from(100.), Schedule::Constant(100.));
        assert_eq!(
            Schedule::from(vec![19., 21.]),
            Schedule::Series(vec![19., 21.])
        );
        assert_eq!(simulation_input.t_set_heating.value_at(9), 20.);
        assert_eq!(simulation_input.t_set_cooling.min(), 30.);
        assert_eq!(simulation_input.validate(), Ok(10));
    }

    #[rstest]
    fn should_parse_project_with_catalog_selection() {
        let input = ingest_for_processing(
            json!({
                "building": {
                    "source": "tabula_selection",
                    "country": "DE",
                    "building_type": "SFH",
                    "construction_year": 1980,
                    "refurbishment": "no_refurbishment",
                    "floor_area": 200.0
                },
                "class_building": "heavy",
                "simulation": {
                    "t_outside": [0.0, 1.0, 2.0],
                    "solar_gains": [0.0, 50.0, 100.0],
                    "internal_gains": 100.0,
                    "t_set_heating": 20.0,
                    "t_set_cooling": 26.0,
                    "max_power_heating": 5000.0,
                    "max_power_cooling": 5000.0
                }
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap();

        assert_eq!(input.class_building, BuildingClass::Heavy);
        assert_eq!(input.simulation.t_m_init, 20.);
        assert_eq!(input.simulation.t_air_init, None);
        assert_eq!(
            input.simulation.unmet_demand_policy,
            UnmetDemandPolicy::Report
        );
        assert_eq!(
            input.simulation.solar_gains,
            Schedule::Series(vec![0., 50., 100.])
        );
        assert_eq!(input.simulation.internal_gains, Schedule::Constant(100.));
        assert_eq!(
            input.building.catalog_query(),
            Some((
                CatalogQuery::Criteria(CatalogCriteria {
                    country: "DE".to_string(),
                    building_type: "SFH".to_string(),
                    construction_year: 1980,
                    refurbishment: Some(Refurbishment::NoRefurbishment),
                }),
                Some(200.)
            ))
        );
    }

    #[rstest]
    fn should_parse_catalog_code_without_floor_area() {
        let building: EnvelopeInput = serde_json::from_value(json!({
            "source": "tabula_code",
            "code": "DE.N.SFH.05.Gen.ReEx.001.002"
        }))
        .unwrap();

        assert_eq!(
            building.catalog_query(),
            Some((
                CatalogQuery::Code("DE.N.SFH.05.Gen.ReEx.001.002".to_string()),
                None
            ))
        );
    }

    #[rstest]
    fn should_reject_unknown_fields() {
        let result = serde_json::from_value::<SimulationInput>(json!({
            "t_outside": [0.0],
            "solar_gains": 0.0,
            "internal_gains": 0.0,
            "t_set_heating": 20.0,
            "t_set_cooling": 26.0,
            "max_power_heating": 1000.0,
            "max_power_cooling": 1000.0,
            "t_set_cooling_min": 24.0
        }));
        assert!(result.is_err());
    }

    #[rstest]
    fn should_return_horizon_for_valid_input(simulation_input: SimulationInput) {
        assert_eq!(simulation_input.validate(), Ok(10));
    }

    #[rstest]
    fn should_reject_empty_outdoor_series(mut simulation_input: SimulationInput) {
        simulation_input.t_outside.clear();
        assert_eq!(
            simulation_input.validate(),
            Err(ConfigurationError::EmptyInputSeries("t_outside"))
        );
    }

    #[rstest]
    fn should_reject_series_of_wrong_length(mut simulation_input: SimulationInput) {
        simulation_input.solar_gains = vec![0.; 9].into();
        assert_eq!(
            simulation_input.validate(),
            Err(ConfigurationError::SeriesLengthMismatch {
                name: "solar_gains",
                expected: 10,
                actual: 9
            })
        );

        simulation_input.solar_gains = vec![].into();
        assert_eq!(
            simulation_input.validate(),
            Err(ConfigurationError::EmptyInputSeries("solar_gains"))
        );
    }

    #[rstest]
    fn should_reject_cooling_setpoint_below_heating(mut simulation_input: SimulationInput) {
        let mut t_set_cooling = vec![26.; 10];
        t_set_cooling[4] = 19.;
        simulation_input.t_set_cooling = t_set_cooling.into();
        assert_eq!(
            simulation_input.validate(),
            Err(ConfigurationError::CoolingSetpointBelowHeating(4))
        );
    }

    #[rstest]
    #[case(20., Err(ConfigurationError::HeatingOverrideNotAbove { minimum_override: 20., maximum_heating: 20. }))]
    #[case(20.1, Err(ConfigurationError::HeatingOverrideMarginTooSmall { margin: 20.1 - 20., minimum: 0.2 }))]
    #[case(20.5, Ok(10))]
    fn should_validate_heating_override(
        mut simulation_input: SimulationInput,
        #[case] t_set_heating_max: f64,
        #[case] expected: Result<usize, ConfigurationError>,
    ) {
        simulation_input.t_set_heating_max = Some(t_set_heating_max.into());
        assert_eq!(simulation_input.validate(), expected);
    }

    #[rstest]
    fn should_reject_negative_device_power(mut simulation_input: SimulationInput) {
        simulation_input.max_power_cooling = -1.;
        assert_eq!(
            simulation_input.validate(),
            Err(ConfigurationError::NegativeDevicePower("cooling"))
        );
    }

    #[rstest]
    fn should_give_schedule_bounds() {
        let schedule = Schedule::Series(vec![19., 21.5, 20.]);
        assert_eq!(schedule.min(), 19.);
        assert_eq!(schedule.max(), 21.5);
        assert_eq!(schedule.value_at(1), 21.5);
        assert_eq!(Schedule::Constant(4.).value_at(99), 4.);
    }
}
