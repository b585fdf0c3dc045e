//! Widget linking - source/listener topology, link colours and the
//! click-to-connect session
//!
//! ## Architecture
//!
//! - `LinkTopology`: who listens to whom, and which colour each source wears
//! - `ColorAllocator`: picks colours perceptually distinct from those in use
//! - `LinkSession`: `Idle` / `Linking { initiator }` plus the overlays on offer
//!
//! The layout drives all three; nothing here touches the renderer. Visual
//! changes leave the layout as [`Cmd`](crate::commands::Cmd) values.

pub mod color;
mod session;
mod topology;

pub use color::{ColorAllocator, LinkColor};
pub use session::{Affordance, LinkSession, LinkingState};
pub use topology::{Detached, Joined, Link, LinkTopology, Unlinked};
