use crate::errors::ConfigurationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::fmt::{Display, Formatter};

/// An opaque element (wall, roof or floor) of the envelope.
///
/// * `area` - in m2
/// * `u_value` - thermal transmittance, in W / (m2.K)
/// * `b_factor` - temperature reduction factor, 1.0 for elements facing outside air
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, Validate)]
pub struct OpaqueElement {
    #[validate(minimum = 0.)]
    pub area: f64,
    #[validate(minimum = 0.)]
    pub u_value: f64,
    #[validate(minimum = 0.)]
    pub b_factor: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, Validate)]
pub struct DoorElement {
    #[validate(minimum = 0.)]
    pub area: f64,
    #[validate(minimum = 0.)]
    pub u_value: f64,
}

/// A glazed element. `g_value` is the total solar energy transmittance at normal incidence
/// and may be absent for buildings described in expert mode.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, Validate)]
pub struct WindowElement {
    #[validate(minimum = 0.)]
    pub area: f64,
    #[validate(minimum = 0.)]
    pub u_value: f64,
    pub g_value: Option<f64>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Orientation {
    Horizontal,
    East,
    South,
    West,
    North,
}

impl Orientation {
    pub const ALL: [Orientation; 5] = [
        Orientation::Horizontal,
        Orientation::East,
        Orientation::South,
        Orientation::West,
        Orientation::North,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Orientation::Horizontal => "a_window_horizontal",
            Orientation::East => "a_window_east",
            Orientation::South => "a_window_south",
            Orientation::West => "a_window_west",
            Orientation::North => "a_window_north",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|orientation| orientation.key() == key)
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Orientation::Horizontal => "horizontal",
            Orientation::East => "east",
            Orientation::South => "south",
            Orientation::West => "west",
            Orientation::North => "north",
        };
        write!(f, "{name}")
    }
}

/// Window areas by facade orientation, in m2
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OrientedWindowAreas {
    pub horizontal: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
    pub north: f64,
}

impl OrientedWindowAreas {
    pub fn area(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.horizontal,
            Orientation::East => self.east,
            Orientation::South => self.south,
            Orientation::West => self.west,
            Orientation::North => self.north,
        }
    }

    fn scaled(&self, ratio: f64) -> Self {
        Self {
            horizontal: self.horizontal * ratio,
            east: self.east * ratio,
            south: self.south * ratio,
            west: self.west * ratio,
            north: self.north * ratio,
        }
    }
}

/// Geometry and material description of a building, as used in expert mode and as the
/// intermediate form of a catalog building.
///
/// Serialised in the keyed-dictionary form (`"a_wall": {"a_wall_1": 12.0}`); keys are checked
/// when deserialising, see [`KeyedBuildingParameters`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Validate)]
#[serde(
    try_from = "KeyedBuildingParameters",
    into = "KeyedBuildingParameters"
)]
pub struct BuildingParameters {
    /// Conditioned floor area, in m2
    #[validate(exclusive_minimum = 0.)]
    pub floor_area: f64,
    /// Ventilation heat transfer coefficient per floor area, in W / (m2.K)
    #[validate(minimum = 0.)]
    pub heat_transfer_coefficient_ventilation: f64,
    /// Air change rate (use + infiltration), in 1 / h
    #[validate(exclusive_minimum = 0.)]
    pub total_air_change_rate: f64,
    /// in m
    #[validate(exclusive_minimum = 0.)]
    pub room_height: f64,
    pub walls: Vec<OpaqueElement>,
    pub roofs: Vec<OpaqueElement>,
    pub floors: Vec<OpaqueElement>,
    pub doors: Vec<DoorElement>,
    pub windows: Vec<WindowElement>,
    pub window_area_by_orientation: OrientedWindowAreas,
    /// Thermal bridging surcharge on the U-value of every external element, in W / (m2.K)
    #[validate(minimum = 0.)]
    pub delta_u_thermal_bridging: f64,
}

impl BuildingParameters {
    /// Check the value ranges of the record and all of its elements.
    pub fn check(&self) -> Result<(), ConfigurationError> {
        let invalid = |context: String| {
            move |errors: serde_valid::validation::Errors| ConfigurationError::InvalidValue {
                context,
                message: errors.to_string(),
            }
        };

        self.validate()
            .map_err(invalid("building parameters".to_string()))?;
        for (kind, elements) in [
            ("wall", &self.walls),
            ("roof", &self.roofs),
            ("floor", &self.floors),
        ] {
            for (i, element) in elements.iter().enumerate() {
                element
                    .validate()
                    .map_err(invalid(format!("{kind} {}", i + 1)))?;
            }
        }
        for (i, door) in self.doors.iter().enumerate() {
            door.validate()
                .map_err(invalid(format!("door {}", i + 1)))?;
        }
        for (i, window) in self.windows.iter().enumerate() {
            window
                .validate()
                .map_err(invalid(format!("window {}", i + 1)))?;
        }
        for orientation in Orientation::ALL {
            if self.window_area_by_orientation.area(orientation) < 0. {
                return Err(ConfigurationError::InvalidValue {
                    context: orientation.key().to_string(),
                    message: "window area must not be negative".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Return a copy resized to `floor_area`. Every absolute area is multiplied by the ratio of
    /// the new to the current floor area; U-values, b-values and the thermal bridging surcharge
    /// are kept.
    pub fn scaled_to_floor_area(&self, floor_area: f64) -> Self {
        let ratio = floor_area / self.floor_area;
        let scale_opaque = |elements: &[OpaqueElement]| {
            elements
                .iter()
                .map(|element| OpaqueElement {
                    area: element.area * ratio,
                    ..*element
                })
                .collect::<Vec<_>>()
        };

        Self {
            floor_area,
            walls: scale_opaque(&self.walls),
            roofs: scale_opaque(&self.roofs),
            floors: scale_opaque(&self.floors),
            doors: self
                .doors
                .iter()
                .map(|door| DoorElement {
                    area: door.area * ratio,
                    ..*door
                })
                .collect(),
            windows: self
                .windows
                .iter()
                .map(|window| WindowElement {
                    area: window.area * ratio,
                    ..*window
                })
                .collect(),
            window_area_by_orientation: self.window_area_by_orientation.scaled(ratio),
            ..self.clone()
        }
    }

    /// Opaque elements in the order walls, roofs, floors.
    pub fn opaque_elements(&self) -> impl Iterator<Item = &OpaqueElement> {
        self.walls
            .iter()
            .chain(self.roofs.iter())
            .chain(self.floors.iter())
    }

    /// Area of all opaque elements including doors, in m2
    pub fn opaque_area(&self) -> f64 {
        self.opaque_elements().map(|element| element.area).sum::<f64>()
            + self.doors.iter().map(|door| door.area).sum::<f64>()
    }

    pub fn window_area(&self) -> f64 {
        self.windows.iter().map(|window| window.area).sum()
    }

    /// Area-weighted g-value of the windows that declare one.
    pub fn mean_glazing_g_value(&self) -> Option<f64> {
        let (weighted, area) = self
            .windows
            .iter()
            .filter_map(|window| window.g_value.map(|g| (g * window.area, window.area)))
            .fold((0., 0.), |(weighted, area), (g_area, a)| {
                (weighted + g_area, area + a)
            });

        (area > 0.).then(|| weighted / area)
    }
}

/// Keyed-dictionary form of [`BuildingParameters`]. Each dictionary key must be the field name
/// followed by `_` and a 1-based element number (`u_roof_2`); `a_window_specific` must hold
/// exactly the five orientation keys.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyedBuildingParameters {
    pub floor_area: f64,
    pub heat_transfer_coefficient_ventilation: f64,
    pub total_air_change_rate: f64,
    pub room_height: f64,
    #[serde(default)]
    pub a_roof: IndexMap<String, f64>,
    #[serde(default)]
    pub u_roof: IndexMap<String, f64>,
    #[serde(default)]
    pub b_roof: IndexMap<String, f64>,
    #[serde(default)]
    pub a_floor: IndexMap<String, f64>,
    #[serde(default)]
    pub u_floor: IndexMap<String, f64>,
    #[serde(default)]
    pub b_floor: IndexMap<String, f64>,
    #[serde(default)]
    pub a_wall: IndexMap<String, f64>,
    #[serde(default)]
    pub u_wall: IndexMap<String, f64>,
    #[serde(default)]
    pub b_wall: IndexMap<String, f64>,
    #[serde(default)]
    pub a_door: IndexMap<String, f64>,
    #[serde(default)]
    pub u_door: IndexMap<String, f64>,
    #[serde(default)]
    pub a_window: IndexMap<String, f64>,
    #[serde(default)]
    pub u_window: IndexMap<String, f64>,
    #[serde(default)]
    pub g_gl_n_window: IndexMap<String, f64>,
    #[serde(default)]
    pub a_window_specific: IndexMap<String, f64>,
    #[serde(default)]
    pub delta_u_thermal_bridging: f64,
}

impl TryFrom<KeyedBuildingParameters> for BuildingParameters {
    type Error = ConfigurationError;

    fn try_from(keyed: KeyedBuildingParameters) -> Result<Self, Self::Error> {
        let walls = opaque_elements(
            "wall",
            indexed_values("a_wall", &keyed.a_wall)?,
            indexed_values("u_wall", &keyed.u_wall)?,
            indexed_values("b_wall", &keyed.b_wall)?,
        )?;
        let roofs = opaque_elements(
            "roof",
            indexed_values("a_roof", &keyed.a_roof)?,
            indexed_values("u_roof", &keyed.u_roof)?,
            indexed_values("b_roof", &keyed.b_roof)?,
        )?;
        let floors = opaque_elements(
            "floor",
            indexed_values("a_floor", &keyed.a_floor)?,
            indexed_values("u_floor", &keyed.u_floor)?,
            indexed_values("b_floor", &keyed.b_floor)?,
        )?;

        let door_areas = indexed_values("a_door", &keyed.a_door)?;
        let door_u_values = indexed_values("u_door", &keyed.u_door)?;
        let doors = (0..door_areas.len().max(door_u_values.len()))
            .map(|i| {
                Ok(DoorElement {
                    area: partner(&door_areas, "door", i, "area")?,
                    u_value: partner(&door_u_values, "door", i, "U-value")?,
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        let window_areas = indexed_values("a_window", &keyed.a_window)?;
        let window_u_values = indexed_values("u_window", &keyed.u_window)?;
        let window_g_values = indexed_values("g_gl_n_window", &keyed.g_gl_n_window)?;
        let window_count = window_areas.len().max(window_u_values.len());
        let windows = (0..window_count)
            .map(|i| {
                Ok(WindowElement {
                    area: partner(&window_areas, "window", i, "area")?,
                    u_value: partner(&window_u_values, "window", i, "U-value")?,
                    g_value: match window_g_values.is_empty() {
                        true => None,
                        false => Some(partner(&window_g_values, "window", i, "g-value")?),
                    },
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;
        if window_g_values.len() > window_count {
            return Err(ConfigurationError::MissingParameterPartner {
                element: "window",
                index: window_count + 1,
                field: "area",
            });
        }

        let parameters = BuildingParameters {
            floor_area: keyed.floor_area,
            heat_transfer_coefficient_ventilation: keyed.heat_transfer_coefficient_ventilation,
            total_air_change_rate: keyed.total_air_change_rate,
            room_height: keyed.room_height,
            walls,
            roofs,
            floors,
            doors,
            windows,
            window_area_by_orientation: oriented_window_areas(&keyed.a_window_specific)?,
            delta_u_thermal_bridging: keyed.delta_u_thermal_bridging,
        };
        parameters.check()?;

        Ok(parameters)
    }
}

impl From<BuildingParameters> for KeyedBuildingParameters {
    fn from(parameters: BuildingParameters) -> Self {
        fn keyed(field: &str, values: impl Iterator<Item = f64>) -> IndexMap<String, f64> {
            values
                .enumerate()
                .map(|(i, value)| (format!("{field}_{}", i + 1), value))
                .collect()
        }

        Self {
            floor_area: parameters.floor_area,
            heat_transfer_coefficient_ventilation: parameters
                .heat_transfer_coefficient_ventilation,
            total_air_change_rate: parameters.total_air_change_rate,
            room_height: parameters.room_height,
            a_roof: keyed("a_roof", parameters.roofs.iter().map(|e| e.area)),
            u_roof: keyed("u_roof", parameters.roofs.iter().map(|e| e.u_value)),
            b_roof: keyed("b_roof", parameters.roofs.iter().map(|e| e.b_factor)),
            a_floor: keyed("a_floor", parameters.floors.iter().map(|e| e.area)),
            u_floor: keyed("u_floor", parameters.floors.iter().map(|e| e.u_value)),
            b_floor: keyed("b_floor", parameters.floors.iter().map(|e| e.b_factor)),
            a_wall: keyed("a_wall", parameters.walls.iter().map(|e| e.area)),
            u_wall: keyed("u_wall", parameters.walls.iter().map(|e| e.u_value)),
            b_wall: keyed("b_wall", parameters.walls.iter().map(|e| e.b_factor)),
            a_door: keyed("a_door", parameters.doors.iter().map(|e| e.area)),
            u_door: keyed("u_door", parameters.doors.iter().map(|e| e.u_value)),
            a_window: keyed("a_window", parameters.windows.iter().map(|e| e.area)),
            u_window: keyed("u_window", parameters.windows.iter().map(|e| e.u_value)),
            g_gl_n_window: match parameters.windows.iter().all(|e| e.g_value.is_some()) {
                true => keyed(
                    "g_gl_n_window",
                    parameters.windows.iter().filter_map(|e| e.g_value),
                ),
                false => IndexMap::new(),
            },
            a_window_specific: Orientation::ALL
                .into_iter()
                .map(|orientation| {
                    (
                        orientation.key().to_string(),
                        parameters.window_area_by_orientation.area(orientation),
                    )
                })
                .collect(),
            delta_u_thermal_bridging: parameters.delta_u_thermal_bridging,
        }
    }
}

/// Values of a keyed dictionary ordered by element number. Keys must read `{field}_{n}` and the
/// numbers must run from 1 without gaps.
fn indexed_values(
    field: &str,
    values: &IndexMap<String, f64>,
) -> Result<Vec<f64>, ConfigurationError> {
    let prefix = format!("{field}_");
    let mut indexed = Vec::with_capacity(values.len());
    for (key, value) in values {
        let suffix =
            key.strip_prefix(&prefix)
                .ok_or_else(|| ConfigurationError::MalformedParameterKey {
                    field: field.to_string(),
                    key: key.clone(),
                })?;
        let index = suffix
            .parse::<usize>()
            .map_err(|_| ConfigurationError::NonIntegerParameterIndex {
                field: field.to_string(),
                key: key.clone(),
            })?;
        indexed.push((index, *value));
    }

    indexed.sort_by_key(|(index, _)| *index);
    if indexed
        .iter()
        .enumerate()
        .any(|(position, (index, _))| *index != position + 1)
    {
        return Err(ConfigurationError::NonContiguousParameterIndices {
            field: field.to_string(),
            expected: indexed.len(),
        });
    }

    Ok(indexed.into_iter().map(|(_, value)| value).collect())
}

fn partner(
    values: &[f64],
    element: &'static str,
    i: usize,
    field: &'static str,
) -> Result<f64, ConfigurationError> {
    values
        .get(i)
        .copied()
        .ok_or(ConfigurationError::MissingParameterPartner {
            element,
            index: i + 1,
            field,
        })
}

fn opaque_elements(
    element: &'static str,
    areas: Vec<f64>,
    u_values: Vec<f64>,
    b_factors: Vec<f64>,
) -> Result<Vec<OpaqueElement>, ConfigurationError> {
    let count = areas.len().max(u_values.len()).max(b_factors.len());
    (0..count)
        .map(|i| {
            Ok(OpaqueElement {
                area: partner(&areas, element, i, "area")?,
                u_value: partner(&u_values, element, i, "U-value")?,
                b_factor: partner(&b_factors, element, i, "b-value")?,
            })
        })
        .collect()
}

fn oriented_window_areas(
    values: &IndexMap<String, f64>,
) -> Result<OrientedWindowAreas, ConfigurationError> {
    if let Some(unknown) = values
        .keys()
        .find(|key| Orientation::from_key(key).is_none())
    {
        return Err(ConfigurationError::UnknownOrientationKey(unknown.clone()));
    }
    let area = |orientation: Orientation| {
        values
            .get(orientation.key())
            .copied()
            .ok_or(ConfigurationError::IncompleteOrientationKeys(
                orientation.key(),
            ))
    };

    Ok(OrientedWindowAreas {
        horizontal: area(Orientation::Horizontal)?,
        east: area(Orientation::East)?,
        south: area(Orientation::South)?,
        west: area(Orientation::West)?,
        north: area(Orientation::North)?,
    })
}
