//! Parsing for "show ip ospf database" style LSA dumps.

pub mod block;
pub mod parse;

pub use parse::LsaParser;
