//! Hyprland-specific implementations.
//!
//! This module provides the concrete
//! [`EventSource`](crate::traits::EventSource) backed by Hyprland's event
//! socket.
//!
//! Nothing outside this module should reference Hyprland's socket layout
//! directly.

pub mod events;
