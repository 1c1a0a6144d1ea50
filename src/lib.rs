mod error;
pub use error::{Error, Result};

pub mod config;
pub mod terminal;

pub mod form;
pub mod html;

pub mod assertion;
pub mod role;

pub mod client;
pub mod sts_assume_role;

pub mod credential_store;
pub mod http_session;
pub mod login_flow;

pub mod cmd;
