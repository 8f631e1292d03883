//! Domain layer - framework-agnostic types shared by services and handlers.

pub mod errors;
pub mod role;
pub mod status;

pub use errors::CirculationError;
pub use role::Role;
