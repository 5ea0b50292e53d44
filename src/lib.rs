pub mod annotation;
pub mod archive;
pub mod error;
pub mod estimator;
pub mod matrix;
pub mod traits;
pub mod transformer;
pub mod value;

pub use error::{ErrorKind, FeaturizerError, Result};
