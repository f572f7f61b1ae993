pub mod chunk;
pub mod schema;
pub mod reader;
pub mod render;
