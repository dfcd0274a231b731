//! # Event Bus Module
//!
//! Publish/subscribe channel between the pattern store, the renderers and
//! the persistence gateway.
//!
//! - Publishers emit typed events without knowing subscribers
//! - Subscribers filter by category
//! - Synchronous handlers and async broadcast receivers are both supported
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blastgrid_core::event_bus::{event_bus, AppEvent, EventCategory, EventFilter, PatternEvent};
//!
//! let subscription = event_bus().subscribe(
//!     EventFilter::only(EventCategory::Pattern),
//!     |event| {
//!         if let AppEvent::Pattern(PatternEvent::PointAdded { point }) = event {
//!             println!("added {}", point.id);
//!         }
//!     },
//! );
//!
//! event_bus().unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
