pub mod delta;
pub mod encoder;
