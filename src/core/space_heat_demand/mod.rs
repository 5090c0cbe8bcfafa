pub mod building_parameters;
pub mod envelope;
pub mod zone;
