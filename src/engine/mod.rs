pub mod ingredients;
pub mod reconstructor;

pub use ingredients::derive_ingredients;
pub use reconstructor::{reconstruct, Sidecar};
