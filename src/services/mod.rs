//! Workflow services.
//!
//! Each service is a stateless free-function API taking the resolved
//! [`crate::models::Environment`] and [`crate::models::ProjectConfig`]
//! explicitly; no service holds ambient state.
//!
//! - [`svg`]: incremental SVG compilation through Inkscape
//! - [`screenshots`]: transactional Rack-config swap and screenshot harvest
//! - [`build`]: CMake build, cppcheck and development-mode Rack launch

pub mod build;
pub mod screenshots;
pub mod svg;
