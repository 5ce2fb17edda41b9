pub mod cat_file;
pub mod hash_object;
