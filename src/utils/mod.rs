pub mod color;
pub mod url;
