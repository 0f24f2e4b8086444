pub mod loader;

pub use loader::{load_working_set, read_working_set};
