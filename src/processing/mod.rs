pub mod control_chart;
pub mod downsampling;
pub mod parameters;
pub mod statistics;
