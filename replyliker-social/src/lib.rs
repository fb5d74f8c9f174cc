//! Social network clients used by replyliker.
//!
//! [`twitter`] holds the X web API client, the reply collector and the like
//! dispatcher; [`pacing`] provides the randomized pauses placed between
//! remote calls.
pub mod pacing;
pub mod twitter;
