pub mod json_ops;

pub use json_ops::{
    initialize_json_file, read_json_file, read_json_file_or_default, with_file_lock,
    write_json_file,
};
