use crate::catalog::{CatalogEntry, CatalogQuery, EnvelopeCatalog};
use crate::core::space_heat_demand::building_parameters::{
    BuildingParameters, Orientation, OrientedWindowAreas,
};
use crate::core::units::{ventilation_conductance, H_IS, H_MS, LAMBDA_AT};
use crate::errors::ConfigurationError;
use serde::Serialize;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use tracing::{info, warn};

/// Floor area ratios outside this band may change the results strongly and unpredictably.
const FLOOR_AREA_RATIO_TOLERANCE: (f64, f64) = (0.9, 1.1);

/// Building mass class, selecting the effective mass area and the internal heat capacity
/// per floor area (ISO 13790, 12.3.1.2).
#[derive(
    Clone, Copy, Debug, Default, Deserialize_enum_str, Eq, Hash, PartialEq, Serialize_enum_str,
)]
pub enum BuildingClass {
    #[serde(rename = "very light")]
    VeryLight,
    #[serde(rename = "light")]
    Light,
    #[default]
    #[serde(rename = "average")]
    Average,
    #[serde(rename = "heavy")]
    Heavy,
    #[serde(rename = "very heavy")]
    VeryHeavy,
}

impl BuildingClass {
    /// Ratio of effective mass area to floor area
    pub fn mass_area_factor(&self) -> f64 {
        match self {
            BuildingClass::VeryLight | BuildingClass::Light | BuildingClass::Average => 2.5,
            BuildingClass::Heavy | BuildingClass::VeryHeavy => 3.0,
        }
    }

    /// Internal heat capacity per floor area, in J / (m2.K)
    pub fn heat_capacity_per_floor_area(&self) -> f64 {
        match self {
            BuildingClass::VeryLight => 80_000.,
            BuildingClass::Light => 110_000.,
            BuildingClass::Average => 165_000.,
            BuildingClass::Heavy => 260_000.,
            BuildingClass::VeryHeavy => 370_000.,
        }
    }
}

/// How a catalog building was resized to the requested floor area.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FloorAreaScaling {
    pub reference_floor_area: f64,
    pub ratio: f64,
}

impl FloorAreaScaling {
    /// Deviation from the reference floor area, in percent (positive when bigger)
    pub fn deviation_percent(&self) -> f64 {
        (self.ratio - 1.) * 100.
    }

    pub fn exceeds_tolerance(&self) -> bool {
        let (lower, upper) = FLOOR_AREA_RATIO_TOLERANCE;
        self.ratio < lower || self.ratio > upper
    }

    /// Advisories about the resizing, empty when the reference floor area is kept.
    pub fn advisories(&self) -> Vec<String> {
        let mut advisories = vec![];
        if self.ratio != 1. {
            let direction = if self.ratio > 1. { "bigger" } else { "smaller" };
            advisories.push(format!(
                "The chosen floor area is {:.3} % {direction} than the catalog reference floor area of {} m2",
                self.deviation_percent().abs(),
                self.reference_floor_area
            ));
        }
        if self.exceeds_tolerance() {
            advisories.push(
                "The chosen floor area is more than 10 % different to the associated catalog building. It might influence the results strongly and unpredictably".to_string(),
            );
        }

        advisories
    }

    fn report(&self) {
        for advisory in self.advisories() {
            warn!("{advisory}");
        }
    }
}

/// Reference values published with a catalog building, scaled to the envelope floor area.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogReference {
    pub code: String,
    /// Transmission heat transfer coefficient, in W / K
    pub h_transmission: f64,
    /// Ventilation heat transfer coefficient, in W / K
    pub h_ventilation: f64,
    /// in kWh / a
    pub q_transmission_losses_annual: f64,
    /// in kWh / a
    pub q_ventilation_losses_annual: f64,
    /// in kWh / a
    pub q_total_losses_annual: f64,
    /// in kWh / a
    pub q_heating_demand_annual: f64,
    /// in kWh / (m2.a)
    pub q_solar_gains_annual: f64,
    /// in kWh / (m2.a)
    pub q_internal_gains_annual: f64,
}

impl CatalogReference {
    fn from_entry(entry: &CatalogEntry, floor_area: f64) -> Self {
        let values = &entry.reference;
        Self {
            code: entry.code.clone(),
            h_transmission: values.h_transmission * floor_area,
            h_ventilation: values.h_ventilation * floor_area,
            q_transmission_losses_annual: values.q_transmission_losses * floor_area,
            q_ventilation_losses_annual: values.q_ventilation_losses * floor_area,
            q_total_losses_annual: values.q_total_losses * floor_area,
            q_heating_demand_annual: values.q_heating_demand * floor_area,
            q_solar_gains_annual: values.q_solar_gains,
            q_internal_gains_annual: values.q_internal_gains,
        }
    }
}

/// Lumped 5R1C description of a building envelope. Produced once per building and shared by
/// any number of simulation runs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BuildingEnvelope {
    class_building: BuildingClass,
    /// area of all surfaces facing the room, in m2
    total_internal_area: f64,
    /// in W / K
    h_ve: f64,
    h_tr_w: f64,
    h_tr_em: f64,
    h_tr_is: f64,
    h_tr_ms: f64,
    /// effective mass area, in m2
    mass_area: f64,
    /// internal heat capacity, in J / K
    c_m: f64,
    floor_area: f64,
    total_air_change_rate: f64,
    heat_transfer_coefficient_ventilation: f64,
    mean_glazing_g_value: Option<f64>,
    parameters: BuildingParameters,
    floor_area_scaling: Option<FloorAreaScaling>,
    catalog_reference: Option<CatalogReference>,
}

impl BuildingEnvelope {
    /// Derive the envelope from user-supplied geometry and materials. Areas are used as given.
    pub fn from_parameters(
        parameters: BuildingParameters,
        class_building: BuildingClass,
    ) -> Result<Self, ConfigurationError> {
        info!("Deriving envelope from explicit building parameters");
        parameters.check()?;

        Self::derive(parameters, class_building, None, None)
    }

    /// Derive the envelope from a catalog building, optionally resized to `floor_area`.
    pub fn from_catalog(
        catalog: &(impl EnvelopeCatalog + ?Sized),
        query: &CatalogQuery,
        class_building: BuildingClass,
        floor_area: Option<f64>,
    ) -> Result<Self, ConfigurationError> {
        let code = catalog.resolve(query)?;
        info!("Deriving envelope from catalog building {code}");
        let entry = catalog.entry(&code)?;

        let (parameters, floor_area_scaling) = match floor_area {
            Some(floor_area) => {
                if floor_area <= 0. {
                    return Err(ConfigurationError::NonPositiveEnvelopeQuantity {
                        name: "floor_area",
                        value: floor_area,
                    });
                }
                let scaling = FloorAreaScaling {
                    reference_floor_area: entry.reference_floor_area,
                    ratio: floor_area / entry.reference_floor_area,
                };
                scaling.report();
                (
                    entry.parameters.scaled_to_floor_area(floor_area),
                    Some(scaling),
                )
            }
            None => (entry.parameters.clone(), None),
        };
        parameters.check()?;
        let catalog_reference = CatalogReference::from_entry(&entry, parameters.floor_area);

        Self::derive(
            parameters,
            class_building,
            floor_area_scaling,
            Some(catalog_reference),
        )
    }

    fn derive(
        parameters: BuildingParameters,
        class_building: BuildingClass,
        floor_area_scaling: Option<FloorAreaScaling>,
        catalog_reference: Option<CatalogReference>,
    ) -> Result<Self, ConfigurationError> {
        let floor_area = parameters.floor_area;
        let total_internal_area = calc_internal_area(floor_area);
        let mass_area = calc_mass_area(floor_area, class_building);

        let envelope = Self {
            class_building,
            total_internal_area,
            h_ve: calc_h_ve(
                parameters.total_air_change_rate,
                parameters.room_height,
                floor_area,
            ),
            h_tr_w: calc_h_tr_w(&parameters),
            h_tr_em: calc_h_tr_em(&parameters),
            h_tr_is: calc_h_tr_is(total_internal_area),
            h_tr_ms: calc_h_tr_ms(mass_area),
            mass_area,
            c_m: calc_c_m(floor_area, class_building),
            floor_area,
            total_air_change_rate: parameters.total_air_change_rate,
            heat_transfer_coefficient_ventilation: parameters
                .heat_transfer_coefficient_ventilation,
            mean_glazing_g_value: parameters.mean_glazing_g_value(),
            parameters,
            floor_area_scaling,
            catalog_reference,
        };
        envelope.check_positive()?;

        Ok(envelope)
    }

    fn check_positive(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("total_internal_area", self.total_internal_area),
            ("h_ve", self.h_ve),
            ("h_tr_w", self.h_tr_w),
            ("h_tr_em", self.h_tr_em),
            ("h_tr_is", self.h_tr_is),
            ("h_tr_ms", self.h_tr_ms),
            ("mass_area", self.mass_area),
            ("c_m", self.c_m),
        ] {
            if value.is_nan() || value <= 0. {
                return Err(ConfigurationError::NonPositiveEnvelopeQuantity { name, value });
            }
        }

        Ok(())
    }

    pub fn class_building(&self) -> BuildingClass {
        self.class_building
    }

    pub fn total_internal_area(&self) -> f64 {
        self.total_internal_area
    }

    /// Conductance to ventilation, in W / K
    pub fn h_ve(&self) -> f64 {
        self.h_ve
    }

    /// Conductance to exterior through glazed surfaces, in W / K
    pub fn h_tr_w(&self) -> f64 {
        self.h_tr_w
    }

    /// Conductance of opaque surfaces to exterior, in W / K
    pub fn h_tr_em(&self) -> f64 {
        self.h_tr_em
    }

    /// Conductance from the internal air to the internal surface node, in W / K
    pub fn h_tr_is(&self) -> f64 {
        self.h_tr_is
    }

    /// Conductance from the internal surface node to the thermal mass, in W / K
    pub fn h_tr_ms(&self) -> f64 {
        self.h_tr_ms
    }

    pub fn mass_area(&self) -> f64 {
        self.mass_area
    }

    /// Internal heat capacity, in J / K
    pub fn c_m(&self) -> f64 {
        self.c_m
    }

    pub fn floor_area(&self) -> f64 {
        self.floor_area
    }

    pub fn total_air_change_rate(&self) -> f64 {
        self.total_air_change_rate
    }

    pub fn heat_transfer_coefficient_ventilation(&self) -> f64 {
        self.heat_transfer_coefficient_ventilation
    }

    pub fn mean_glazing_g_value(&self) -> Option<f64> {
        self.mean_glazing_g_value
    }

    pub fn window_area_by_orientation(&self) -> &OrientedWindowAreas {
        &self.parameters.window_area_by_orientation
    }

    /// Element geometry the conductances were derived from (after any floor area scaling).
    pub fn parameters(&self) -> &BuildingParameters {
        &self.parameters
    }

    pub fn floor_area_scaling(&self) -> Option<&FloorAreaScaling> {
        self.floor_area_scaling.as_ref()
    }

    pub fn catalog_reference(&self) -> Option<&CatalogReference> {
        self.catalog_reference.as_ref()
    }
}

/// Solar irradiance on the facade of one orientation, in W / m2 per timestep
#[derive(Clone, Debug, PartialEq)]
pub struct OrientedIrradiance {
    pub orientation: Orientation,
    pub irradiance: Vec<f64>,
}

/// Solar gains through the glazing, in W per timestep: the area-weighted g-value times the
/// window area and irradiance of each orientation. Orientations without irradiance contribute
/// nothing. The result can be used directly as the solar gains of a simulation.
pub fn calc_solar_gains(
    envelope: &BuildingEnvelope,
    irradiance_by_orientation: &[OrientedIrradiance],
) -> Result<Vec<f64>, ConfigurationError> {
    let g_value = envelope
        .mean_glazing_g_value()
        .ok_or_else(|| ConfigurationError::InvalidValue {
            context: "solar gains".to_string(),
            message: "the glazing has no g-values".to_string(),
        })?;
    let horizon = irradiance_by_orientation
        .first()
        .map_or(0, |facade| facade.irradiance.len());

    let mut gains = vec![0.; horizon];
    for facade in irradiance_by_orientation {
        if facade.irradiance.len() != horizon {
            return Err(ConfigurationError::InvalidValue {
                context: format!("irradiance on the {} facade", facade.orientation),
                message: format!(
                    "{} values given, expected {horizon}",
                    facade.irradiance.len()
                ),
            });
        }
        let effective_area =
            g_value * envelope.window_area_by_orientation().area(facade.orientation);
        for (gain, irradiance) in gains.iter_mut().zip(&facade.irradiance) {
            *gain += effective_area * irradiance;
        }
    }

    Ok(gains)
}

pub fn calc_internal_area(floor_area: f64) -> f64 {
    floor_area * LAMBDA_AT
}

/// Conductance of walls, roofs, floors and doors including the thermal bridging surcharge
pub fn calc_h_tr_em(parameters: &BuildingParameters) -> f64 {
    let h_elements = parameters
        .opaque_elements()
        .map(|element| element.area * element.u_value * element.b_factor)
        .chain(parameters.doors.iter().map(|door| door.area * door.u_value))
        .sum::<f64>();

    h_elements + parameters.delta_u_thermal_bridging * parameters.opaque_area()
}

/// Conductance of glazing including the thermal bridging surcharge
pub fn calc_h_tr_w(parameters: &BuildingParameters) -> f64 {
    let h_windows = parameters
        .windows
        .iter()
        .map(|window| window.area * window.u_value)
        .sum::<f64>();

    h_windows + parameters.delta_u_thermal_bridging * parameters.window_area()
}

/// Ventilation conductance (ISO 13790, 9.3.1), supply air at outside temperature
pub fn calc_h_ve(total_air_change_rate: f64, room_height: f64, floor_area: f64) -> f64 {
    ventilation_conductance(total_air_change_rate * room_height * floor_area)
}

pub fn calc_h_tr_is(total_internal_area: f64) -> f64 {
    H_IS * total_internal_area
}

pub fn calc_h_tr_ms(mass_area: f64) -> f64 {
    H_MS * mass_area
}

pub fn calc_mass_area(floor_area: f64, class_building: BuildingClass) -> f64 {
    floor_area * class_building.mass_area_factor()
}

pub fn calc_c_m(floor_area: f64, class_building: BuildingClass) -> f64 {
    floor_area * class_building.heat_capacity_per_floor_area()
}
