pub mod filesystem;

pub use filesystem::{sanitize_filename, timestamped_name, FileStorage};
