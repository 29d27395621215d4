mod engine;
mod types;

pub use engine::{insured_salary, resolve_rate, run_projection};
pub use types::{Inputs, Projection, RateBracket, YearRecord};
