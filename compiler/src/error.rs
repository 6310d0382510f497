// Licensed under the Apache-2.0 license

//! Error types for the register file compiler.
//!
//! Every failure is one of three root kinds: a [`Kind::Config`] problem
//! (bad literal, bad option combination, unknown name), a [`Kind::Conflict`]
//! (structurally valid parts that collide with each other), or a
//! [`Kind::Capacity`] limit (arithmetic overflow, size limits). Context
//! variants wrap the root cause with the field, register, interrupt or
//! internal signal the error was detected in.

use std::fmt::Display;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    Config(String),
    Conflict(String),
    Capacity(String),
    FieldError {
        field_name: String,
        err: Box<Error>,
    },
    RegisterError {
        register_name: String,
        err: Box<Error>,
    },
    InterruptError {
        interrupt_name: String,
        err: Box<Error>,
    },
    InternalError {
        internal_name: String,
        err: Box<Error>,
    },
}

/// Root kind of an [`Error`], ignoring context wrappers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    Config,
    Conflict,
    Capacity,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Error {
        Error::Config(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Error {
        Error::Conflict(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Error {
        Error::Capacity(msg.into())
    }

    pub fn root_cause(&self) -> &Error {
        match self {
            Self::FieldError { err, .. } => err.root_cause(),
            Self::RegisterError { err, .. } => err.root_cause(),
            Self::InterruptError { err, .. } => err.root_cause(),
            Self::InternalError { err, .. } => err.root_cause(),
            err => err,
        }
    }

    pub fn kind(&self) -> Kind {
        match self.root_cause() {
            Self::Config(_) => Kind::Config,
            Self::Conflict(_) => Kind::Conflict,
            Self::Capacity(_) => Kind::Capacity,
            _ => unreachable!("root cause is always a leaf"),
        }
    }

    pub fn in_field(self, field_name: impl Into<String>) -> Error {
        Error::FieldError {
            field_name: field_name.into(),
            err: Box::new(self),
        }
    }

    pub fn in_register(self, register_name: impl Into<String>) -> Error {
        Error::RegisterError {
            register_name: register_name.into(),
            err: Box::new(self),
        }
    }

    pub fn in_interrupt(self, interrupt_name: impl Into<String>) -> Error {
        Error::InterruptError {
            interrupt_name: interrupt_name.into(),
            err: Box::new(self),
        }
    }

    pub fn in_internal(self, internal_name: impl Into<String>) -> Error {
        Error::InternalError {
            internal_name: internal_name.into(),
            err: Box::new(self),
        }
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Capacity(msg) => write!(f, "capacity exceeded: {msg}"),
            Self::FieldError { field_name, err } => write!(f, "field {field_name:?}: {err}"),
            Self::RegisterError { register_name, err } => {
                write!(f, "register {register_name:?}: {err}")
            }
            Self::InterruptError {
                interrupt_name,
                err,
            } => {
                write!(f, "interrupt {interrupt_name:?}: {err}")
            }
            Self::InternalError { internal_name, err } => {
                write!(f, "internal {internal_name:?}: {err}")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
