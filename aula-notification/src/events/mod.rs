pub mod hub;
pub mod subscriber;

pub use hub::{DeliveryHub, Invalidation, InvalidationBus, SubscriberHub};
