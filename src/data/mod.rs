pub mod cleaning;
pub mod datetime;
pub mod loader;
pub mod parser;
