pub mod functions;

pub use functions::LossKind;
