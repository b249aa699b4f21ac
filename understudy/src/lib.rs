//! Setup matching and call interception for test substitutes.
//!
//! `understudy` is the engine behind a fluent mocking API. Test code
//! registers *setups* on a [`Substitute`]: a call signature, one
//! [`Matcher`] per parameter, and the behavior to run when a matching call
//! arrives. Generated stand-in objects forward every real call to
//! [`Substitute::call`], which records the call, resolves it to the newest
//! matching setup, runs that setup's callbacks, and produces its result.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use understudy::{Callback, CallSignature, Matcher, Substitute, Value, ValueKind};
//!
//! let sub = Substitute::named("command-runner");
//! let execute = CallSignature::new("Execute", vec![ValueKind::Str], ValueKind::Bool);
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let setup = sub.setup(execute.clone(), vec![Matcher::any()]).unwrap();
//! sub.callback(setup, Callback::new(1, move |args| {
//!     sink.lock().push(args.arg::<String>(0)?);
//!     Ok(())
//! })).unwrap();
//! sub.returns(setup, true).unwrap();
//!
//! assert_eq!(sub.call(&execute, vec![Value::from("go")]), Ok(Value::Bool(true)));
//! assert_eq!(*seen.lock(), vec!["go".to_string()]);
//! ```
//!
//! # Modules
//!
//! - [`value`]: argument/result values, kinds and faults
//! - [`signature`]: call identities
//! - [`matcher`]: per-argument predicates
//! - [`setup`]: registered expectations, callbacks, result producers, call bounds
//! - [`registry`]: the per-substitute setup arena
//! - [`invocation`]: recorded calls
//! - [`resolve`]: setup resolution
//! - [`dispatch`]: end-to-end handling of one call
//! - [`verify`]: call-count and coverage assertions
//! - [`substitute`]: the shared, locked entry point
//! - [`config`]: substitute configuration

pub mod config;
pub mod dispatch;
pub mod error;
pub mod invocation;
pub mod matcher;
pub mod registry;
pub mod resolve;
pub mod setup;
pub mod signature;
pub mod substitute;
pub mod value;
pub mod verify;

pub use config::{SubstituteConfig, UnmatchedPolicy};
pub use dispatch::Dispatcher;
pub use error::{ConfigError, DispatchError, SetupError, VerificationError, VerificationFailure};
pub use invocation::{Invocation, InvocationLog};
pub use matcher::{Matcher, Predicate};
pub use registry::SetupRegistry;
pub use resolve::{MatchEngine, NoMatch, Resolution};
pub use setup::{CallBound, Callback, ResultProducer, Setup, SetupId, SetupState};
pub use signature::CallSignature;
pub use substitute::{SetupHandle, Substitute};
pub use value::{Args, Fault, FromValue, Value, ValueKind};
