//! Sign-in flow state.

mod flow;

pub use flow::{LoginError, LoginFlow, LoginStep};
