pub mod evaluator;
pub mod payment;
pub mod ports;
