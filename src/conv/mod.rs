pub mod source;
pub mod bitmap;
pub mod extract;
pub mod ttf;
