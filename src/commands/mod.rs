pub mod add;
pub mod events;
pub mod list;
pub mod remove;
pub mod set;
pub mod sync;
pub mod watch;
