pub mod attack;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate_soup;
pub mod machine;
pub mod mixer;
pub mod register;
pub mod solver;

pub use error::{Error,Result};
