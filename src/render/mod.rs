pub mod json;

pub use json::write_report;
