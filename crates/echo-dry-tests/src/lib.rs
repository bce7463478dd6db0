// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for echo-mock.
#![forbid(unsafe_code)]
//!
//! Generated proxies are out of scope for the engine, so the test suite uses
//! the hand-written ones here.
//!
//! # Modules
//!
//! - [`capture`] - Capture cells and call counters usable as setup callbacks
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`members`] - Member descriptors and shapes of the fixture interfaces
//! - [`proxies`] - Fake proxies that dispatch into a mock

pub mod capture;
pub mod config;
pub mod members;
pub mod proxies;

pub use capture::{CallCounter, Capture};
pub use config::InMemoryConfigStore;
pub use proxies::{FactoryProxy, GenericProxy, ProxyError, ServiceProxy};
