// sal-net/src/lib.rs
pub mod channel;
pub mod command;
pub mod process;
pub mod ssh;

pub use channel::{ExecResult, ProgressFn, RemoteChannel};
pub use command::{is_valid_name, validate_name, RemoteCommand};
pub use ssh::SshChannel;
