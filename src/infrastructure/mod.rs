pub mod csv_row_source;
pub mod fips_lookup_client;
