pub mod jurisdiction_resolver;
pub mod jurisdiction_table;
pub mod row_validator;
pub mod tax_calculator;
