pub mod digitizer;
pub mod reading;
