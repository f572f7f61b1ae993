pub mod error;
pub mod fhft;
pub mod conv;
