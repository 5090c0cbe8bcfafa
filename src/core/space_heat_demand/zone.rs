use crate::core::space_heat_demand::envelope::BuildingEnvelope;
use crate::core::units::{H_MS, SECONDS_PER_HOUR};
use crate::errors::{BuildingModelError, ImpossibleDemandError};
use crate::input::{SimulationInput, UnmetDemandPolicy};
use rayon::prelude::*;
use serde::Serialize;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use tracing::{debug, warn};

/// Test load injected to probe the zone response, in W per m2 of floor area
const TEST_LOAD_PER_FLOOR_AREA: f64 = 10.;

/// Weights of air and surface temperature in the operative temperature (ISO 13790, C.10)
const OPERATIVE_AIR_WEIGHT: f64 = 0.3;
const OPERATIVE_SURFACE_WEIGHT: f64 = 0.7;

#[derive(Clone, Copy, Debug, Deserialize_enum_str, Eq, Hash, PartialEq, Serialize_enum_str)]
pub enum OperatingMode {
    #[serde(rename = "no load")]
    NoLoad,
    #[serde(rename = "heating")]
    Heating,
    #[serde(rename = "cooling")]
    Cooling,
}

/// Boundary conditions of one timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepConditions {
    /// in deg C
    pub t_outside: f64,
    /// in W
    pub internal_gains: f64,
    /// in W
    pub solar_gains: f64,
    pub t_set_heating: f64,
    pub t_set_cooling: f64,
}

/// Capacity of the ideal heating/cooling device, both as positive numbers in W
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceLimits {
    pub max_power_heating: f64,
    pub max_power_cooling: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemandResolution {
    pub mode: OperatingMode,
    /// power to reach the active setpoint ignoring device limits, in W (negative for cooling)
    pub unrestricted_demand: f64,
    /// power actually delivered, in W (negative for cooling)
    pub energy_demand: f64,
}

impl DemandResolution {
    /// Part of the unrestricted demand the device could not deliver, in W (negative for cooling)
    pub fn unmet_demand(&self) -> f64 {
        self.unrestricted_demand - self.energy_demand
    }
}

/// Node temperatures and heat flows of the network for one timestep.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimulationState {
    /// mass temperature carried in from the previous timestep, in deg C
    pub t_m_prev: f64,
    /// mass temperature at the end of the timestep, in deg C
    pub t_m_next: f64,
    /// mean mass temperature over the timestep, in deg C
    pub t_m: f64,
    /// internal surface temperature, in deg C
    pub t_s: f64,
    /// internal air temperature, in deg C
    pub t_air: f64,
    /// heat flow into the air node, in W
    pub phi_ia: f64,
    /// heat flow into the surface node, in W
    pub phi_st: f64,
    /// heat flow into the mass node, in W
    pub phi_m: f64,
    pub phi_m_tot: f64,
    pub mode: OperatingMode,
    /// conditioning power delivered, in W (negative for cooling)
    pub energy_demand: f64,
    /// conditioning power the device could not deliver, in W (negative for cooling)
    pub unmet_demand: f64,
}

impl SimulationState {
    /// State reported when the air temperature is forced at the start of a run.
    fn forced(t_m_prev: f64, t_air: f64) -> Self {
        Self {
            t_m_prev,
            t_m_next: t_m_prev,
            t_m: t_m_prev,
            t_s: t_air,
            t_air,
            phi_ia: 0.,
            phi_st: 0.,
            phi_m: 0.,
            phi_m_tot: 0.,
            mode: OperatingMode::NoLoad,
            energy_demand: 0.,
            unmet_demand: 0.,
        }
    }

    pub fn t_operative(&self) -> f64 {
        OPERATIVE_AIR_WEIGHT * self.t_air + OPERATIVE_SURFACE_WEIGHT * self.t_s
    }

    pub fn has_heating_demand(&self) -> bool {
        self.mode == OperatingMode::Heating
    }

    pub fn has_cooling_demand(&self) -> bool {
        self.mode == OperatingMode::Cooling
    }

    pub fn heating_demand(&self) -> f64 {
        if self.has_heating_demand() {
            self.energy_demand
        } else {
            0.
        }
    }

    pub fn cooling_demand(&self) -> f64 {
        if self.has_cooling_demand() {
            -self.energy_demand
        } else {
            0.
        }
    }
}

/// Output series of one simulation run, one value per timestep.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SimulationResults {
    /// in W
    pub heating_demand: Vec<f64>,
    /// in W, as a positive number
    pub cooling_demand: Vec<f64>,
    /// in deg C
    pub t_air: Vec<f64>,
    pub t_operative: Vec<f64>,
    pub t_m: Vec<f64>,
    pub t_s: Vec<f64>,
    /// heating power the device could not deliver, in W
    pub unmet_heating: Vec<f64>,
    /// cooling power the device could not deliver, in W
    pub unmet_cooling: Vec<f64>,
    pub mode: Vec<OperatingMode>,
}

impl SimulationResults {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            heating_demand: Vec::with_capacity(capacity),
            cooling_demand: Vec::with_capacity(capacity),
            t_air: Vec::with_capacity(capacity),
            t_operative: Vec::with_capacity(capacity),
            t_m: Vec::with_capacity(capacity),
            t_s: Vec::with_capacity(capacity),
            unmet_heating: Vec::with_capacity(capacity),
            unmet_cooling: Vec::with_capacity(capacity),
            mode: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, state: &SimulationState) {
        self.heating_demand.push(state.heating_demand());
        self.cooling_demand.push(state.cooling_demand());
        self.t_air.push(state.t_air);
        self.t_operative.push(state.t_operative());
        self.t_m.push(state.t_m);
        self.t_s.push(state.t_s);
        self.unmet_heating.push(state.unmet_demand.max(0.));
        self.unmet_cooling.push((-state.unmet_demand).max(0.));
        self.mode.push(state.mode);
    }

    pub fn len(&self) -> usize {
        self.t_air.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t_air.is_empty()
    }

    /// Number of timesteps where the device could not reach the setpoint
    pub fn unmet_steps(&self) -> usize {
        self.unmet_heating
            .iter()
            .zip(&self.unmet_cooling)
            .filter(|(&heating, &cooling)| heating > 0. || cooling > 0.)
            .count()
    }
}

/// The 5R1C network of one building envelope, stepped hour by hour (ISO 13790, C.3).
pub struct ThermalNetwork<'a> {
    envelope: &'a BuildingEnvelope,
    h_tr_1: f64,
    h_tr_2: f64,
    h_tr_3: f64,
}

impl<'a> ThermalNetwork<'a> {
    pub fn new(envelope: &'a BuildingEnvelope) -> Self {
        let h_tr_1 = 1. / (1. / envelope.h_ve() + 1. / envelope.h_tr_is());
        let h_tr_2 = h_tr_1 + envelope.h_tr_w();
        let h_tr_3 = 1. / (1. / h_tr_2 + 1. / envelope.h_tr_ms());

        Self {
            envelope,
            h_tr_1,
            h_tr_2,
            h_tr_3,
        }
    }

    pub fn envelope(&self) -> &BuildingEnvelope {
        self.envelope
    }

    pub fn h_tr_1(&self) -> f64 {
        self.h_tr_1
    }

    pub fn h_tr_2(&self) -> f64 {
        self.h_tr_2
    }

    pub fn h_tr_3(&self) -> f64 {
        self.h_tr_3
    }

    /// Calculate the node temperatures for a given conditioning power.
    ///
    /// # Arguments
    /// * `t_m_prev` - mass temperature at the end of the previous timestep, in deg C
    /// * `conditions` - outdoor temperature and gains of the timestep
    /// * `energy_demand` - conditioning power injected into the air node, in W
    pub fn calc_temperatures(
        &self,
        t_m_prev: f64,
        conditions: &StepConditions,
        energy_demand: f64,
    ) -> SimulationState {
        let envelope = self.envelope;
        let (h_ve, h_tr_w, h_tr_em, h_tr_is, h_tr_ms) = (
            envelope.h_ve(),
            envelope.h_tr_w(),
            envelope.h_tr_em(),
            envelope.h_tr_is(),
            envelope.h_tr_ms(),
        );
        let mass_ratio = envelope.mass_area() / envelope.total_internal_area();
        let t_out = conditions.t_outside;

        // Heat flows into the air, surface and mass nodes
        let half_internal_gains = 0.5 * conditions.internal_gains;
        let phi_ia = half_internal_gains + energy_demand;
        let phi_st = (1. - mass_ratio - h_tr_w / (H_MS * envelope.total_internal_area()))
            * (half_internal_gains + conditions.solar_gains);
        let phi_m = mass_ratio * (half_internal_gains + conditions.solar_gains);

        let phi_m_tot = phi_m
            + h_tr_em * t_out
            + self.h_tr_3 * (phi_st + h_tr_w * t_out + self.h_tr_1 * (phi_ia / h_ve + t_out))
                / self.h_tr_2;

        // Crank-Nicolson step of the mass node, c_m per hour in Wh / K
        let c_m_hourly = envelope.c_m() / SECONDS_PER_HOUR as f64;
        let h_mass_loss = 0.5 * (self.h_tr_3 + h_tr_em);
        let t_m_next =
            (t_m_prev * (c_m_hourly - h_mass_loss) + phi_m_tot) / (c_m_hourly + h_mass_loss);
        let t_m = (t_m_next + t_m_prev) / 2.;

        let t_s = (h_tr_ms * t_m
            + phi_st
            + h_tr_w * t_out
            + self.h_tr_1 * (t_out + phi_ia / h_ve))
            / (h_tr_ms + h_tr_w + self.h_tr_1);
        let t_air = (h_tr_is * t_s + h_ve * t_out + phi_ia) / (h_tr_is + h_ve);

        SimulationState {
            t_m_prev,
            t_m_next,
            t_m,
            t_s,
            t_air,
            phi_ia,
            phi_st,
            phi_m,
            phi_m_tot,
            mode: OperatingMode::NoLoad,
            energy_demand,
            unmet_demand: 0.,
        }
    }

    /// Decide the operating mode and the conditioning power of the timestep.
    ///
    /// The air temperature is affine in the injected power, so the power reaching the active
    /// setpoint is interpolated from a free-floating probe and a probe with a test load.
    pub fn resolve_demand(
        &self,
        t_m_prev: f64,
        conditions: &StepConditions,
        limits: &DeviceLimits,
    ) -> DemandResolution {
        let t_air_0 = self.calc_temperatures(t_m_prev, conditions, 0.).t_air;

        let (mode, t_air_set) = if t_air_0 < conditions.t_set_heating {
            (OperatingMode::Heating, conditions.t_set_heating)
        } else if t_air_0 > conditions.t_set_cooling {
            (OperatingMode::Cooling, conditions.t_set_cooling)
        } else {
            return DemandResolution {
                mode: OperatingMode::NoLoad,
                unrestricted_demand: 0.,
                energy_demand: 0.,
            };
        };

        let test_load = TEST_LOAD_PER_FLOOR_AREA * self.envelope.floor_area();
        let t_air_10 = self.calc_temperatures(t_m_prev, conditions, test_load).t_air;
        let unrestricted_demand = test_load * (t_air_set - t_air_0) / (t_air_10 - t_air_0);

        DemandResolution {
            mode,
            unrestricted_demand,
            energy_demand: unrestricted_demand
                .max(-limits.max_power_cooling)
                .min(limits.max_power_heating),
        }
    }

    /// Advance the network by one timestep from the mass temperature `t_m_prev`.
    pub fn step(
        &self,
        timestep: usize,
        t_m_prev: f64,
        conditions: &StepConditions,
        limits: &DeviceLimits,
        policy: UnmetDemandPolicy,
    ) -> Result<SimulationState, ImpossibleDemandError> {
        let resolution = self.resolve_demand(t_m_prev, conditions, limits);
        debug!(
            "Timestep {timestep}: {} with {} W",
            resolution.mode, resolution.energy_demand
        );

        let unmet_demand = resolution.unmet_demand();
        if unmet_demand != 0. && policy == UnmetDemandPolicy::Fail {
            let limit = match resolution.mode {
                OperatingMode::Cooling => -limits.max_power_cooling,
                _ => limits.max_power_heating,
            };
            return Err(ImpossibleDemandError {
                timestep,
                mode: resolution.mode,
                unrestricted_demand: resolution.unrestricted_demand,
                limit,
            });
        }

        Ok(SimulationState {
            mode: resolution.mode,
            unmet_demand,
            ..self.calc_temperatures(t_m_prev, conditions, resolution.energy_demand)
        })
    }

    /// Run the whole horizon of `input`. The mass temperature at the end of each timestep is
    /// carried into the next one.
    pub fn simulate(
        &self,
        input: &SimulationInput,
    ) -> Result<SimulationResults, BuildingModelError> {
        let horizon = input.validate()?;
        let limits = DeviceLimits {
            max_power_heating: input.max_power_heating,
            max_power_cooling: input.max_power_cooling,
        };

        let mut results = SimulationResults::with_capacity(horizon);
        let mut t_m_prev = input.t_m_init;
        let mut start = 0;

        if let Some(t_air_init) = input.t_air_init {
            results.push(&SimulationState::forced(t_m_prev, t_air_init));
            start = 1;
        }

        for timestep in start..horizon {
            let conditions = StepConditions {
                t_outside: input.t_outside[timestep],
                internal_gains: input.internal_gains.value_at(timestep),
                solar_gains: input.solar_gains.value_at(timestep),
                t_set_heating: input.t_set_heating.value_at(timestep),
                t_set_cooling: input.t_set_cooling.value_at(timestep),
            };
            let state = self.step(
                timestep,
                t_m_prev,
                &conditions,
                &limits,
                input.unmet_demand_policy,
            )?;
            results.push(&state);
            t_m_prev = state.t_m_next;
        }

        let unmet_steps = results.unmet_steps();
        if unmet_steps > 0 {
            warn!("Setpoint could not be reached within the device limits in {unmet_steps} of {horizon} timesteps");
        }

        Ok(results)
    }
}

/// Simulate independent buildings in parallel.
pub fn simulate_many(
    runs: &[(&BuildingEnvelope, &SimulationInput)],
) -> Vec<Result<SimulationResults, BuildingModelError>> {
    runs.par_iter()
        .map(|(envelope, input)| ThermalNetwork::new(envelope).simulate(input))
        .collect()
}
