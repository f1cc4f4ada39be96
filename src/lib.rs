pub mod actuator;
pub mod animation;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod interaction;
pub mod rig;
pub mod sensor;
pub mod utils;

pub use error::{Result, RigError};
