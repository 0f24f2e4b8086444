pub mod correlation;

pub use correlation::{pearson_matrix, CorrelationMatrix};
