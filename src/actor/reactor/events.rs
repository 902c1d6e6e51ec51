pub mod command;
pub mod system;
pub mod window;
