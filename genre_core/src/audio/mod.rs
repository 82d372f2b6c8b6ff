pub mod decoder;
pub mod mel;
pub mod window;
