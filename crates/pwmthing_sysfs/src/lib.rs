//!This library drives PWM output channels exposed through the Linux sysfs interface and
//!adapts them to the property contract in `pwmthing_core`.

//internal error type for the hardware side
pub mod error;

//the channel contract and its sysfs implementation
pub mod channel;

//configuration with defaults for channels and properties
pub mod config;

//property adapters backed by a hardware channel
pub mod output;
