pub mod parse;
pub mod runner;
