#![deny(
    // The following are allowed by default lints according to
    // https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
    anonymous_parameters,
    bare_trait_objects,
    missing_copy_implementations,
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

//! TCP listener and connection handles over the edge-uv reactor.
//!
//! The handles are plain `Copy` tokens; every operation takes the reactor
//! explicitly and forwards to it.

/// `host:port` parsing and resolution.
pub mod addr;

/// Listener and connection handles.
pub mod tcp;

pub use addr::{resolve, split_host_port};
pub use tcp::{TcpConn, TcpListener};
