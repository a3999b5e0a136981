#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for relup
//!
//! This crate provides the HTTP implementation of the download service:
//! a pooled client with retry logic and a service that streams release
//! artifacts to disk, tracking each transfer by numeric identifier.

mod client;
mod service;

pub use client::{NetClient, NetConfig};
pub use service::HttpDownloadService;
