pub mod client;
pub mod command;
pub mod game_file;
pub mod session;

pub use client::{ClientError, GatewayClient};
pub use command::{Command, CommandError};
pub use game_file::{GameFile, GameFileError};
pub use session::{EditingSession, SaveReport, SessionError, SessionState, StreamOutcome};
