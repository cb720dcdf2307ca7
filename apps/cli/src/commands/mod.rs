//! 命令定义和实现

pub mod config;
pub mod ports;
pub mod positions;
pub mod run;
pub mod status;

pub use config::ConfigCommand;
pub use ports::PortsCommand;
pub use positions::PositionsCommand;
pub use run::RunCommand;
pub use status::StatusCommand;
