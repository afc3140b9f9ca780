//! Prism Environment
//!
//! Best-effort host signals consumed by the capability probe: installed memory,
//! logical cores, user agent, display density, network class and motion
//! preference. Missing values stay `None`; defaults are chosen by the probe.

pub mod memory;
pub mod signals;
pub mod user_agent;

pub use memory::HostResources;
pub use signals::{ConnectionClass, DeviceSignals, GraphicsSignal};
pub use user_agent::is_mobile_user_agent;
