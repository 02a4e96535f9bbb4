pub mod cli;
pub mod mode;
