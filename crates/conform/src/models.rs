//! These models represent the objects passed between the agent, its backend and its tools
//!
//! The backend adapters convert [`message::Turn`]s into their own wire format at the edge;
//! everything inside the crate only ever sees the internal structs.
pub mod message;
pub mod role;
pub mod tool;
