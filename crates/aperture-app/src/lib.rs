//! Portal installation session: platform directories, the fixed-rate tick
//! loop, scripted capture-device input, and the server/client session.

pub mod platform;
pub mod script;
pub mod session;
pub mod tick_loop;
