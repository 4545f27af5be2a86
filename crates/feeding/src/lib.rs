//! Feeding domain module: feed types, deliveries and consumption estimates.
//!
//! Feed is delivered into building silos and handed out per room. Nothing
//! measures what a room eats, so consumption is inferred from the remaining
//! weight recorded at each delivery and the animal-days fed in between.

pub mod feed;
pub mod inventory;
pub mod periods;

pub use feed::{FeedDelivery, FeedType, RoomFeedingChange, suggested_feed_type};
pub use inventory::{DeliveryPoint, FeedInventory, feed_capacity};
pub use periods::{feed_type_at, feeding_periods};
