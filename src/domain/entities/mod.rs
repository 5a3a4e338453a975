pub mod import_session;
pub mod jurisdiction;
pub mod order;
