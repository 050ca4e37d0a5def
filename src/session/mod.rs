//! Per-user session state and the store that owns it.

pub mod model;
pub mod store;

pub use model::{AccommodationQuery, FoodPreferences, PlaceCategory, Session, TripQuery};
pub use store::{SessionEntry, SessionHandle, SessionStore, spawn_eviction_task};
