pub mod alignment;
pub mod analyzer;
pub mod assessment;
pub mod config;
pub mod error;
pub mod extract;
pub mod input;
pub mod knowledge;
pub mod model;
pub mod outcomes;
pub mod pipeline;
pub mod questions;
pub mod stats;
pub mod structurer;
pub mod types;
pub mod validator;

pub use error::{Result, SyllabusError};
