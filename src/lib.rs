#![doc = include_str!("../README.md")]

pub mod canon;
pub mod cli;
pub mod error;
pub mod isolate;
pub mod log;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod strategies;
pub mod types;
pub mod validator;

pub use error::{ResolveError, Result, SessionError};
pub use registry::RunRegistry;
pub use resolver::Resolver;
pub use session::{BrowserSession, Element, ElementHandle};
pub use types::*;
