#![deny(
    // The following are allowed by default lints according to
    // https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
    anonymous_parameters,
    bare_trait_objects,
    missing_debug_implementations,
    unstable_features,
    unused_extern_crates,
    unused_import_braces,
)]
#![warn(
    missing_docs,
    unused_qualifications,
    single_use_lifetimes,
    trivial_numeric_casts,
    unreachable_pub,
    unused_results,
    clippy::all,
    clippy::pedantic,
)]
#![allow(
    // Some explicitly allowed Clippy lints, must have clear reason to allow
    clippy::module_name_repetitions, // repeation of module name in a struct name is not big deal
    clippy::missing_errors_doc,
    clippy::indexing_slicing,
)]

//! A minimal, single-threaded, edge-triggered I/O reactor.
//!
//! One [`Reactor`] owns the OS readiness facility and every registered
//! descriptor. Applications arm reads, writes and accepts with completion
//! callbacks; the reactor resumes them as readiness edges arrive and invokes
//! each callback exactly once per arming.

#[cfg(not(unix))]
compile_error!("edge-uv-core requires a unix platform");

#[cfg(not(target_pointer_width = "64"))]
compile_error!("edge-uv-core packs directory tokens into a 64-bit selector key");

#[allow(missing_docs)]
pub mod log;

/// Reactor configuration.
pub mod config;

/// Error types.
pub mod error;

/// Raw socket syscalls behind a replaceable seam.
pub mod syscall;

/// Generational arena mapping selector keys to descriptor states.
pub mod directory;

mod descriptor;

mod selector;

mod sockaddr;

mod socket;

/// The event loop.
pub mod reactor;

pub use config::Config;
pub use directory::Token;
pub use error::{Error, Result};
pub use reactor::{AcceptCallback, ReadCallback, Reactor, WriteCallback};
pub use syscall::{NetSyscall, RawNetSyscall};
