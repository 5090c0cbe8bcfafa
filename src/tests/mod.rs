mod test_catalog_envelope;
