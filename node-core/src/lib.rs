#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared logic for the door/cabinet sensor node feature set.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library and exposing abstractions the other crates can
// adopt. Everything hardware-facing (GPIO, the CAN transceiver, persistent
// storage, the update loader, the indicator LED) sits behind a trait defined
// here and implemented by the target crates.

pub mod addressing;
pub mod broadcast;
pub mod control;
pub mod debounce;
pub mod diagnostics;
pub mod frame;
pub mod indicator;
pub mod node;
pub mod provisioning;
pub mod sampling;
pub mod store;
pub mod time;
pub mod update;
