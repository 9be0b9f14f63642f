//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Fit** | Lanczos3 `resize_exact` into the fitted size |
//! | **Fill** | Lanczos3 `resize_exact` to cover + centered `crop_imm` |
//! | **Encode** | `image` encoders chosen by output extension |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Transform**: The resize engine over an in-memory image
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
pub mod transform;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{fill_dimensions, fit_dimensions, target_height};
pub use params::{Quality, ResizeBox, ResizeMethod, ResizeSpec};
pub use rust_backend::RustBackend;
pub use transform::resize;
