//! Hardware drivers for RF test equipment.
//!
//! This crate provides the instrument transport and drivers used by the
//! power measurement service. Drivers for specific instrument families are
//! feature-gated for optional compilation.
//!
//! # Modules
//!
//! - [`scpi`] - SCPI over raw TCP sockets or VISA, resource name routing and
//!   the [`ScpiSession`](scpi::ScpiSession) trait (always available)
//! - `rs` - Rohde & Schwarz NRP power sensor driver (feature `rs-nrp`)
//!
//! # Features
//!
//! - `rs-nrp` - R&S NRP power sensors
//! - `visa` - USB and other non-LAN resources through a VISA library
//! - `hardware-tests` - Tests that need a real sensor on the network

pub mod scpi;

#[cfg(feature = "rs-nrp")]
pub mod rs;
