//!A mod for the error types
use std::fmt::Debug;

///Common error type when building properties from configuration.
pub enum BuildError {
    Message(String),
    Messages(Vec<String>),
}

impl BuildError {
    pub fn from_string(msg: String) -> Self {
        BuildError::Message(msg)
    }
    pub fn from_errs(errs: Vec<BuildError>) -> Self {
        let mut messages = Vec::with_capacity(errs.len());
        for err in errs {
            match err {
                Self::Message(msg) => messages.push(msg),
                Self::Messages(mut msgs) => messages.append(&mut msgs),
            }
        }
        Self::Messages(messages)
    }
    pub fn message(msg: &str) -> Self {
        BuildError::Message(msg.to_string())
    }
}

impl Debug for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => f.write_fmt(format_args!("BuildError: {}", message)),
            Self::Messages(messages) => f.write_fmt(format_args!(
                "BuildError (multiple): \n{}",
                messages.join("\n")
            )),
        }
    }
}
