//! A long-lived worker that drives a single browser page for an external
//! controller, speaking one JSON document per line on stdin/stdout.
//!
//! The controller addresses elements by the integer ids of the latest
//! [`types::Observation`]. Those ids are ordinals into the live list of
//! visible interactive elements, re-derived on every command, and are
//! undefined once the DOM changes underneath them.

pub mod actions;
pub mod config;
pub mod dom;
pub mod error;
pub mod hands;
pub mod heuristic;
pub mod observation;
pub mod page;
pub mod recovery;
pub mod types;
pub mod worker;

pub use error::{PageError, WorkerError};
pub use page::Page;
pub use worker::{Shutdown, Worker};
