pub mod order_handler;
