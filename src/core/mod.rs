pub mod space_heat_demand;
pub mod units;
