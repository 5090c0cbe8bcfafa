use crate::core::space_heat_demand::zone::OperatingMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildingModelError {
    #[error("Request was considered invalid due to error: {0}")]
    InvalidRequest(#[from] anyhow::Error),
    #[error("Building or simulation is misconfigured: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Error identified during simulation: {0}")]
    ImpossibleDemand(#[from] ImpossibleDemandError),
}

/// Problems with the inputs that are detected before any envelope or trajectory is produced.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{count} catalog buildings match {criteria}, expected at most one")]
    AmbiguousCatalogMatch { count: usize, criteria: String },
    #[error("No catalog building matches {0}")]
    NoCatalogMatch(String),
    #[error("Building code {0} does not exist in the catalog")]
    UnknownBuildingCode(String),
    #[error("Catalog column {column} of building {code} is not numeric: {value:?}")]
    MalformedCatalogField {
        column: String,
        code: String,
        value: String,
    },
    #[error("Catalog does not provide column {0}")]
    MissingCatalogColumn(String),
    #[error("All keys in {field} must start with {field}_ (found {key})")]
    MalformedParameterKey { field: String, key: String },
    #[error("The numeric part of key {key} in {field} must be a positive integer")]
    NonIntegerParameterIndex { field: String, key: String },
    #[error("Keys in {field} must be numbered 1 to {expected} without gaps")]
    NonContiguousParameterIndices { field: String, expected: usize },
    #[error("{element} {index} is missing its {field} value")]
    MissingParameterPartner {
        element: &'static str,
        index: usize,
        field: &'static str,
    },
    #[error("a_window_specific must provide {0}")]
    IncompleteOrientationKeys(&'static str),
    #[error("a_window_specific does not accept key {0}")]
    UnknownOrientationKey(String),
    #[error("Invalid value in {context}: {message}")]
    InvalidValue { context: String, message: String },
    #[error("{name} must be strictly positive, got {value}")]
    NonPositiveEnvelopeQuantity { name: &'static str, value: f64 },
    #[error("Input series {0} is empty")]
    EmptyInputSeries(&'static str),
    #[error("Input series {name} has {actual} values, expected {expected}")]
    SeriesLengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Cooling setpoint is below heating setpoint at timestep {0}")]
    CoolingSetpointBelowHeating(usize),
    #[error("Heating override setpoint ({minimum_override}) must be higher than heating setpoint ({maximum_heating})")]
    HeatingOverrideNotAbove {
        minimum_override: f64,
        maximum_heating: f64,
    },
    #[error("Heating override setpoint must exceed heating setpoint by at least {minimum} K, margin is {margin} K")]
    HeatingOverrideMarginTooSmall { margin: f64, minimum: f64 },
    #[error("Maximum {0} power must be a non-negative number")]
    NegativeDevicePower(&'static str),
}

/// Raised when the conditioning power needed to reach setpoint exceeds what the device can deliver.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{mode} demand of {unrestricted_demand} W at timestep {timestep} exceeds the device limit of {limit} W")]
pub struct ImpossibleDemandError {
    pub timestep: usize,
    pub mode: OperatingMode,
    pub unrestricted_demand: f64,
    pub limit: f64,
}
