pub const SECONDS_PER_HOUR: u32 = 3_600;
pub const WATTS_PER_KILOWATT: u32 = 1_000;

/// Volumetric heat capacity of air, in J / (m3.K) (ISO 13790, 9.3.1)
pub const AIR_VOLUMETRIC_HEAT_CAPACITY: f64 = 1_200.;

/// Heat transfer coefficient between mass and surface nodes, in W / (m2.K) (ISO 13790, 12.2.2)
pub const H_MS: f64 = 9.1;

/// Heat transfer coefficient between air and surface nodes, in W / (m2.K) (ISO 13790, 7.2.2.2)
pub const H_IS: f64 = 3.45;

/// Ratio between the area of all room-facing surfaces and the floor area (ISO 13790, 7.2.2.2)
pub const LAMBDA_AT: f64 = 4.5;

/// Energy delivered by a constant power over one hourly timestep.
pub fn watts_over_hour_to_kwh(power: f64) -> f64 {
    power / WATTS_PER_KILOWATT as f64
}

/// Ventilation rate in m3 / h, converted to a conductance in W / K.
pub(crate) fn ventilation_conductance(volume_flow_per_hour: f64) -> f64 {
    AIR_VOLUMETRIC_HEAT_CAPACITY / SECONDS_PER_HOUR as f64 * volume_flow_per_hour
}
