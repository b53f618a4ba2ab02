pub mod error;

pub use error::{PodguardError, Result};
