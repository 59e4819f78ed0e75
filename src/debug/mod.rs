pub mod numerical_check;

pub use numerical_check::{check_layers, check_values, NumericalIssue};
