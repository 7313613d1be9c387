//! rbstata: Stata dta version conversion library
//!
//! Converts Stata `.dta` files written by newer Stata releases into the
//! format an older Stata can open, with file naming helpers and a native
//! dta reader and writer.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
