//! Controller module for binding state and click loops
//!
//! Each target moves through four states:
//! - Idle: no trigger bound
//! - Listening: the next captured trigger becomes the binding
//! - Armed: trigger bound, not clicking
//! - Active: trigger bound, repeating clicks every interval

mod click_loop;
mod machine;

pub use machine::{
    AutoClickController, BindingsSnapshot, Command, ControllerClosed, ControllerHandle,
    TargetState,
};
