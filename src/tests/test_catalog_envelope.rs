mod test_catalog_envelope {
    use crate::catalog::tests::{catalog, SAMPLE_CATALOG};
    use crate::catalog::{CatalogCriteria, CatalogQuery, Refurbishment, TabulaCatalog};
    use crate::core::space_heat_demand::envelope::{BuildingClass, BuildingEnvelope};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn selection() -> CatalogQuery {
        CatalogQuery::Criteria(CatalogCriteria {
            country: "DE".to_string(),
            building_type: "SFH".to_string(),
            construction_year: 1980,
            refurbishment: Some(Refurbishment::NoRefurbishment),
        })
    }

    #[rstest]
    fn should_derive_envelope_at_reference_floor_area(
        catalog: TabulaCatalog,
        selection: CatalogQuery,
    ) {
        let envelope =
            BuildingEnvelope::from_catalog(&catalog, &selection, BuildingClass::Average, None)
                .unwrap();

        assert_relative_eq!(envelope.h_tr_em(), 249.2, max_relative = 1e-12);
        assert_relative_eq!(envelope.h_tr_w(), 79.5, max_relative = 1e-12);
        assert_relative_eq!(envelope.h_ve(), 75., max_relative = 1e-12);
        assert_eq!(envelope.floor_area(), 150.);
        assert_relative_eq!(envelope.heat_transfer_coefficient_ventilation(), 0.5);
        assert_relative_eq!(
            envelope.mean_glazing_g_value().unwrap(),
            (25. * 0.75 + 5. * 0.6) / 30.,
            max_relative = 1e-12
        );
        assert!(envelope.floor_area_scaling().is_none());

        let reference = envelope.catalog_reference().unwrap();
        assert_eq!(reference.code, "DE.N.SFH.06.Gen.ReEx.001.001");
        assert_relative_eq!(reference.h_transmission, 240., max_relative = 1e-12);
        assert_relative_eq!(reference.q_heating_demand_annual, 21_000.);
        assert_eq!(reference.q_solar_gains_annual, 15.);
    }

    #[rstest]
    fn should_derive_refurbished_variant_by_code(catalog: TabulaCatalog) {
        let envelope = BuildingEnvelope::from_catalog(
            &catalog,
            &CatalogQuery::Code("DE.N.SFH.06.Gen.ReEx.001.002".to_string()),
            BuildingClass::Average,
            None,
        )
        .unwrap();

        assert_relative_eq!(envelope.h_tr_em(), 138.2, max_relative = 1e-12);
        assert_relative_eq!(envelope.h_tr_w(), 42., max_relative = 1e-12);
    }

    #[rstest]
    fn should_derive_identical_envelopes_from_identical_selection(selection: CatalogQuery) {
        let first_catalog = TabulaCatalog::from_reader(SAMPLE_CATALOG.as_bytes()).unwrap();
        let second_catalog = TabulaCatalog::from_reader(SAMPLE_CATALOG.as_bytes()).unwrap();

        let first = BuildingEnvelope::from_catalog(
            &first_catalog,
            &selection,
            BuildingClass::Heavy,
            Some(180.),
        )
        .unwrap();
        let second = BuildingEnvelope::from_catalog(
            &second_catalog,
            &selection,
            BuildingClass::Heavy,
            Some(180.),
        )
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.h_tr_em().to_bits(), second.h_tr_em().to_bits());
    }

    #[rstest]
    fn should_scale_areas_but_not_material_properties(
        catalog: TabulaCatalog,
        selection: CatalogQuery,
    ) {
        let reference =
            BuildingEnvelope::from_catalog(&catalog, &selection, BuildingClass::Average, None)
                .unwrap();
        let scaled = BuildingEnvelope::from_catalog(
            &catalog,
            &selection,
            BuildingClass::Average,
            Some(200.),
        )
        .unwrap();
        let ratio = 200. / 150.;

        let (before, after) = (reference.parameters(), scaled.parameters());
        for (before, after) in before.opaque_elements().zip(after.opaque_elements()) {
            assert_relative_eq!(after.area, before.area * ratio, max_relative = 1e-12);
            assert_eq!(after.u_value, before.u_value);
            assert_eq!(after.b_factor, before.b_factor);
        }
        for (before, after) in before.windows.iter().zip(&after.windows) {
            assert_relative_eq!(after.area, before.area * ratio, max_relative = 1e-12);
            assert_eq!(after.u_value, before.u_value);
            assert_eq!(after.g_value, before.g_value);
        }
        assert_relative_eq!(
            after.doors[0].area,
            before.doors[0].area * ratio,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            after.window_area_by_orientation.south,
            before.window_area_by_orientation.south * ratio,
            max_relative = 1e-12
        );
        assert_eq!(
            after.delta_u_thermal_bridging,
            before.delta_u_thermal_bridging
        );

        assert_relative_eq!(scaled.h_tr_em(), 332.26666666666665, max_relative = 1e-12);
        assert_relative_eq!(scaled.h_tr_w(), 106., max_relative = 1e-12);
        assert_relative_eq!(scaled.h_ve(), 100., max_relative = 1e-12);
        assert_relative_eq!(scaled.h_tr_is(), 3105., max_relative = 1e-12);
        assert_relative_eq!(scaled.h_tr_ms(), 4550., max_relative = 1e-12);
        assert_eq!(scaled.c_m(), 33_000_000.);

        let scaling = scaled.floor_area_scaling().unwrap();
        assert_eq!(scaling.reference_floor_area, 150.);
        assert!(scaling.exceeds_tolerance());
        assert_relative_eq!(
            scaled.catalog_reference().unwrap().h_transmission,
            320.,
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_select_oldest_building_with_unbounded_start_year(catalog: TabulaCatalog) {
        let envelope = BuildingEnvelope::from_catalog(
            &catalog,
            &CatalogQuery::Criteria(CatalogCriteria {
                country: "DE".to_string(),
                building_type: "SFH".to_string(),
                construction_year: 1800,
                refurbishment: Some(Refurbishment::NoRefurbishment),
            }),
            BuildingClass::VeryLight,
            None,
        )
        .unwrap();

        assert_eq!(envelope.floor_area(), 220.);
        assert_eq!(envelope.c_m(), 80_000. * 220.);
    }
}
