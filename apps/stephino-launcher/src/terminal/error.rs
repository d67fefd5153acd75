use crate::auth::AuthError;
use crate::shell::ShellError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Shell(#[from] ShellError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("login rejected: {0}")]
    Rejected(String),
}
