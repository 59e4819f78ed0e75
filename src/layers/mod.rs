pub mod dense;
pub mod dropout;
pub mod initialization;

pub use dense::DenseLayer;
pub use dropout::Dropout;
pub use initialization::WeightInit;
