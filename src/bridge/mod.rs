//! # Conversion registry.
//!
//! - [`Registry`]: immutable `Route → Converter` table assembled from platforms.
//! - [`Target`]: typed view that converts any envelope into one handle type.

mod registry;
mod view;

pub use registry::{Converter, Registry, RegistryBuilder, Route};
pub use view::Target;
