pub mod analysis;
pub mod clustering;
pub mod errors;
pub mod export;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod utils;
