pub mod import_engine;
pub mod import_service;
pub mod order_pricer;
pub mod order_service;
pub mod session_registry;
