pub mod branch;
pub mod index;
pub mod objects;
pub mod pack;
pub mod transfer;
