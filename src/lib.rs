pub mod macros;

pub mod config;
pub mod consolidation;
pub mod deposit_file;
pub mod deposit_root;
pub mod error;
pub mod globals;
pub mod helpers;
pub mod logger;
pub mod snapshot;
pub mod topup;
pub mod validator;
pub mod withdrawal;
