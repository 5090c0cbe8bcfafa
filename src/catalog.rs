use crate::core::space_heat_demand::building_parameters::{
    BuildingParameters, DoorElement, OpaqueElement, OrientedWindowAreas, WindowElement,
};
use crate::errors::ConfigurationError;
use csv::{ReaderBuilder as CsvReaderBuilder, StringRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Data type marker of the reference ("exemplary") buildings in the TABULA catalog.
pub const REFERENCE_EXEMPLARY: &str = "ReEx";

const COLUMN_CODE: &str = "Code_BuildingVariant";
const COLUMN_COUNTRY: &str = "Code_Country";
const COLUMN_SIZE_CLASS: &str = "Code_BuildingSizeClass";
const COLUMN_DATA_TYPE: &str = "Code_DataType_Building";
const COLUMN_YEAR_FIRST: &str = "Year1_Building";
const COLUMN_YEAR_LAST: &str = "Year2_Building";
const COLUMN_VARIANT: &str = "Number_BuildingVariant";

// U-values are taken from the measured/calculated columns (U_Measure_*)
const U_VALUE_KIND: &str = "Measure_";

const NUMBER_OF_WALLS: usize = 3;
const NUMBER_OF_ROOFS: usize = 2;
const NUMBER_OF_FLOORS: usize = 2;
const NUMBER_OF_WINDOWS: usize = 2;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Refurbishment {
    NoRefurbishment,
    UsualRefurbishment,
    AdvancedRefurbishment,
}

impl Refurbishment {
    /// Catalog building variant number of this refurbishment tier
    pub fn variant_number(&self) -> u32 {
        match self {
            Refurbishment::NoRefurbishment => 1,
            Refurbishment::UsualRefurbishment => 2,
            Refurbishment::AdvancedRefurbishment => 3,
        }
    }
}

/// Selection of a catalog building by country, size class, construction year and, if given,
/// refurbishment tier.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogCriteria {
    pub country: String,
    pub building_type: String,
    pub construction_year: i32,
    #[serde(default)]
    pub refurbishment: Option<Refurbishment>,
}

impl Display for CatalogCriteria {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "country {}, building type {}, construction year {}",
            self.country, self.building_type, self.construction_year
        )?;
        if let Some(refurbishment) = self.refurbishment {
            write!(f, ", variant {}", refurbishment.variant_number())?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CatalogQuery {
    Code(String),
    Criteria(CatalogCriteria),
}

/// Reference results the catalog publishes per m2 of reference floor area.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CatalogReferenceValues {
    /// in W / (m2.K)
    pub h_transmission: f64,
    /// in W / (m2.K)
    pub h_ventilation: f64,
    /// in kWh / (m2.a)
    pub q_transmission_losses: f64,
    pub q_ventilation_losses: f64,
    pub q_total_losses: f64,
    pub q_heating_demand: f64,
    pub q_solar_gains: f64,
    pub q_internal_gains: f64,
}

/// One catalog building at its reference floor area.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    pub code: String,
    pub reference_floor_area: f64,
    pub parameters: BuildingParameters,
    pub reference: CatalogReferenceValues,
}

/// Source of reference buildings.
pub trait EnvelopeCatalog {
    /// Code of the single building matching `criteria`, `None` when nothing matches.
    /// More than one match is an error.
    fn select(&self, criteria: &CatalogCriteria) -> Result<Option<String>, ConfigurationError>;

    fn entry(&self, code: &str) -> Result<CatalogEntry, ConfigurationError>;

    fn resolve(&self, query: &CatalogQuery) -> Result<String, ConfigurationError> {
        match query {
            CatalogQuery::Code(code) => Ok(code.clone()),
            CatalogQuery::Criteria(criteria) => self
                .select(criteria)?
                .ok_or_else(|| ConfigurationError::NoCatalogMatch(criteria.to_string())),
        }
    }
}

/// TABULA building typology export, held as raw records and parsed on demand.
#[derive(Clone, Debug)]
pub struct TabulaCatalog {
    columns: IndexMap<String, usize>,
    records: Vec<StringRecord>,
}

impl TabulaCatalog {
    pub fn from_reader(reader: impl Read) -> Result<Self, anyhow::Error> {
        let mut reader = CsvReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let columns = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect::<IndexMap<_, _>>();
        let records = reader
            .records()
            .collect::<Result<Vec<StringRecord>, csv::Error>>()?;

        Ok(Self { columns, records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn rows(&self) -> impl Iterator<Item = TabulaRow<'_>> {
        self.records.iter().map(|record| TabulaRow {
            columns: &self.columns,
            record,
        })
    }
}

impl EnvelopeCatalog for TabulaCatalog {
    fn select(&self, criteria: &CatalogCriteria) -> Result<Option<String>, ConfigurationError> {
        let year = criteria.construction_year as f64;
        let mut matches = vec![];

        for row in self.rows() {
            if row.text(COLUMN_COUNTRY)? != criteria.country
                || row.text(COLUMN_SIZE_CLASS)? != criteria.building_type
                || row.text(COLUMN_DATA_TYPE)? != REFERENCE_EXEMPLARY
            {
                continue;
            }
            if row.coerced_number(COLUMN_YEAR_FIRST)? > year
                || row.coerced_number(COLUMN_YEAR_LAST)? < year
            {
                continue;
            }
            if let Some(refurbishment) = criteria.refurbishment {
                if row.coerced_number(COLUMN_VARIANT)? != refurbishment.variant_number() as f64 {
                    continue;
                }
            }
            matches.push(row.code()?.to_string());
        }

        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(ConfigurationError::AmbiguousCatalogMatch {
                count,
                criteria: criteria.to_string(),
            }),
        }
    }

    fn entry(&self, code: &str) -> Result<CatalogEntry, ConfigurationError> {
        let row = self
            .rows()
            .find(|row| row.code().is_ok_and(|row_code| row_code == code))
            .ok_or_else(|| ConfigurationError::UnknownBuildingCode(code.to_string()))?;

        row.entry()
    }
}

struct TabulaRow<'a> {
    columns: &'a IndexMap<String, usize>,
    record: &'a StringRecord,
}

impl<'a> TabulaRow<'a> {
    fn text(&self, column: &str) -> Result<&'a str, ConfigurationError> {
        self.columns
            .get(column)
            .and_then(|&i| self.record.get(i))
            .map(str::trim)
            .ok_or_else(|| ConfigurationError::MissingCatalogColumn(column.to_string()))
    }

    fn code(&self) -> Result<&'a str, ConfigurationError> {
        self.text(COLUMN_CODE)
    }

    /// Numeric field; an empty field stands for an absent element and reads as zero.
    fn number(&self, column: &str) -> Result<f64, ConfigurationError> {
        let value = self.text(column)?;
        if value.is_empty() {
            return Ok(0.);
        }

        value
            .parse::<f64>()
            .map_err(|_| ConfigurationError::MalformedCatalogField {
                column: column.to_string(),
                code: self.code().unwrap_or_default().to_string(),
                value: value.to_string(),
            })
    }

    /// Numeric field used for selection, where anything non-numeric counts as zero.
    fn coerced_number(&self, column: &str) -> Result<f64, ConfigurationError> {
        Ok(self.text(column)?.parse::<f64>().unwrap_or(0.))
    }

    fn opaque_elements(
        &self,
        kind: &str,
        count: usize,
    ) -> Result<Vec<OpaqueElement>, ConfigurationError> {
        (1..=count)
            .map(|i| {
                Ok(OpaqueElement {
                    area: self.number(&format!("A_{kind}_{i}"))?,
                    u_value: self.number(&format!("U_{U_VALUE_KIND}{kind}_{i}"))?,
                    b_factor: self.number(&format!("b_Transmission_{kind}_{i}"))?,
                })
            })
            .collect()
    }

    fn entry(&self) -> Result<CatalogEntry, ConfigurationError> {
        let code = self.code()?.to_string();
        let reference_floor_area = self.number("A_C_Ref")?;
        if reference_floor_area <= 0. {
            return Err(ConfigurationError::NonPositiveEnvelopeQuantity {
                name: "A_C_Ref",
                value: reference_floor_area,
            });
        }

        let windows = (1..=NUMBER_OF_WINDOWS)
            .map(|i| {
                Ok(WindowElement {
                    area: self.number(&format!("A_Window_{i}"))?,
                    u_value: self.number(&format!("U_{U_VALUE_KIND}Window_{i}"))?,
                    g_value: Some(self.number(&format!("g_gl_n_Window_{i}"))?),
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        let parameters = BuildingParameters {
            floor_area: reference_floor_area,
            heat_transfer_coefficient_ventilation: self.number("h_Ventilation")?,
            total_air_change_rate: self.number("n_air_use")? + self.number("n_air_infiltration")?,
            room_height: self.number("h_room")?,
            walls: self.opaque_elements("Wall", NUMBER_OF_WALLS)?,
            roofs: self.opaque_elements("Roof", NUMBER_OF_ROOFS)?,
            floors: self.opaque_elements("Floor", NUMBER_OF_FLOORS)?,
            doors: vec![DoorElement {
                area: self.number("A_Door_1")?,
                u_value: self.number(&format!("U_{U_VALUE_KIND}Door_1"))?,
            }],
            windows,
            window_area_by_orientation: OrientedWindowAreas {
                horizontal: self.number("A_Window_Horizontal")?,
                east: self.number("A_Window_East")?,
                south: self.number("A_Window_South")?,
                west: self.number("A_Window_West")?,
                north: self.number("A_Window_North")?,
            },
            delta_u_thermal_bridging: self.number("delta_U_ThermalBridging")?,
        };

        let reference = CatalogReferenceValues {
            h_transmission: self.number("h_Transmission")?,
            h_ventilation: self.number("h_Ventilation")?,
            q_transmission_losses: self.number("q_ht_tr")?,
            q_ventilation_losses: self.number("q_ht_ve")?,
            q_total_losses: self.number("q_ht")?,
            q_heating_demand: self.number("q_h_nd")?,
            q_solar_gains: self.number("q_sol")?,
            q_internal_gains: self.number("q_int")?,
        };

        Ok(CatalogEntry {
            code,
            reference_floor_area,
            parameters,
            reference,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::space_heat_demand::envelope::{BuildingClass, BuildingEnvelope};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    pub(crate) const SAMPLE_CATALOG: &str = include_str!("tests/fixtures/tabula_sample.csv");

    #[fixture]
    pub(crate) fn catalog() -> TabulaCatalog {
        TabulaCatalog::from_reader(SAMPLE_CATALOG.as_bytes()).unwrap()
    }

    fn criteria(
        country: &str,
        building_type: &str,
        construction_year: i32,
        refurbishment: Option<Refurbishment>,
    ) -> CatalogCriteria {
        CatalogCriteria {
            country: country.to_string(),
            building_type: building_type.to_string(),
            construction_year,
            refurbishment,
        }
    }

    #[rstest]
    fn should_read_all_rows(catalog: TabulaCatalog) {
        assert_eq!(catalog.len(), 7);
        assert!(!catalog.is_empty());
    }

    #[rstest]
    #[case(Some(Refurbishment::NoRefurbishment), "DE.N.SFH.06.Gen.ReEx.001.001")]
    #[case(Some(Refurbishment::UsualRefurbishment), "DE.N.SFH.06.Gen.ReEx.001.002")]
    fn should_select_reference_building_by_variant(
        catalog: TabulaCatalog,
        #[case] refurbishment: Option<Refurbishment>,
        #[case] expected: &str,
    ) {
        assert_eq!(
            catalog
                .select(&criteria("DE", "SFH", 1980, refurbishment))
                .unwrap(),
            Some(expected.to_string())
        );
    }

    #[rstest]
    fn should_treat_construction_year_bounds_as_inclusive(catalog: TabulaCatalog) {
        for year in [1979, 1983] {
            assert!(catalog
                .select(&criteria(
                    "DE",
                    "SFH",
                    year,
                    Some(Refurbishment::NoRefurbishment)
                ))
                .unwrap()
                .is_some());
        }
        assert_eq!(
            catalog
                .select(&criteria(
                    "DE",
                    "SFH",
                    1984,
                    Some(Refurbishment::NoRefurbishment)
                ))
                .unwrap(),
            None
        );
    }

    #[rstest]
    fn should_coerce_missing_year_bound_to_zero(catalog: TabulaCatalog) {
        assert_eq!(
            catalog.select(&criteria("DE", "SFH", 1850, None)).unwrap(),
            Some("DE.N.SFH.01.Gen.ReEx.001.001".to_string())
        );
    }

    #[rstest]
    fn should_fail_when_more_than_one_building_matches(catalog: TabulaCatalog) {
        assert_eq!(
            catalog.select(&criteria("XX", "SFH", 1950, None)),
            Err(ConfigurationError::AmbiguousCatalogMatch {
                count: 2,
                criteria: "country XX, building type SFH, construction year 1950".to_string()
            })
        );
        // Without a refurbishment tier every variant of the DE 1980 building matches
        assert!(matches!(
            catalog.select(&criteria("DE", "SFH", 1980, None)),
            Err(ConfigurationError::AmbiguousCatalogMatch { count: 2, .. })
        ));
    }

    #[rstest]
    fn should_fail_ambiguous_selection_before_deriving_envelope(catalog: TabulaCatalog) {
        let result = BuildingEnvelope::from_catalog(
            &catalog,
            &CatalogQuery::Criteria(criteria("XX", "SFH", 1950, None)),
            BuildingClass::Average,
            None,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::AmbiguousCatalogMatch { .. })
        ));
    }

    #[rstest]
    fn should_report_no_match_when_resolving_criteria(catalog: TabulaCatalog) {
        assert_eq!(
            catalog.resolve(&CatalogQuery::Criteria(criteria(
                "FR",
                "SFH",
                1980,
                Some(Refurbishment::AdvancedRefurbishment)
            ))),
            Err(ConfigurationError::NoCatalogMatch(
                "country FR, building type SFH, construction year 1980, variant 3".to_string()
            ))
        );
    }

    #[rstest]
    fn should_read_entry_at_reference_floor_area(catalog: TabulaCatalog) {
        let entry = catalog.entry("DE.N.SFH.06.Gen.ReEx.001.001").unwrap();

        assert_eq!(entry.reference_floor_area, 150.);
        assert_eq!(entry.parameters.floor_area, 150.);
        assert_eq!(entry.parameters.walls.len(), 3);
        assert_eq!(entry.parameters.roofs.len(), 2);
        assert_eq!(entry.parameters.floors[0].area, 80.);
        assert_eq!(entry.parameters.walls[1].b_factor, 0.5);
        assert_eq!(entry.parameters.windows[0].g_value, Some(0.75));
        assert_eq!(entry.parameters.window_area_by_orientation.south, 14.);
        assert_relative_eq!(entry.parameters.total_air_change_rate, 0.6);
        assert_eq!(entry.parameters.room_height, 2.5);
        assert_eq!(entry.reference.h_transmission, 1.6);
        assert_eq!(entry.reference.q_heating_demand, 140.);
    }

    #[rstest]
    fn should_fail_for_unknown_code(catalog: TabulaCatalog) {
        assert_eq!(
            catalog.entry("DE.N.TH.01.Gen.ReEx.001.001"),
            Err(ConfigurationError::UnknownBuildingCode(
                "DE.N.TH.01.Gen.ReEx.001.001".to_string()
            ))
        );
    }

    #[rstest]
    fn should_fail_for_non_numeric_field(catalog: TabulaCatalog) {
        assert_eq!(
            catalog.entry("DE.N.MFH.06.Gen.ReEx.001.001"),
            Err(ConfigurationError::MalformedCatalogField {
                column: "A_Wall_1".to_string(),
                code: "DE.N.MFH.06.Gen.ReEx.001.001".to_string(),
                value: "n/a".to_string(),
            })
        );
    }

    #[rstest]
    fn should_fail_for_missing_column() {
        let catalog =
            TabulaCatalog::from_reader("Code_BuildingVariant,A_C_Ref\nAB.1,100\n".as_bytes())
                .unwrap();
        assert_eq!(
            catalog.entry("AB.1"),
            Err(ConfigurationError::MissingCatalogColumn(
                "A_Window_1".to_string()
            ))
        );
    }
}
