//! Explicit state machines for the user-facing flows.
//!
//! Each flow is a small FSM that owns its form fields and phase. The app
//! drives transitions and performs the actual network call; the machines
//! never touch the network themselves, so every transition is testable
//! without a server or a rendering environment.

pub mod enroll;
pub mod login;
pub mod register;

pub use enroll::{EnrollFlow, EnrollPhase};
pub use login::{LoginFlow, LoginPhase};
pub use register::{RegisterFlow, RegisterPhase};
