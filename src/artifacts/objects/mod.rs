pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length in bytes of a hex-encoded object digest.
pub const OBJECT_ID_LENGTH: usize = 40;
