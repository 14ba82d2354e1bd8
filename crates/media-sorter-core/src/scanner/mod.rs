pub mod walk;

pub use walk::{count_files, remove_emptied_tree, walk_files};
