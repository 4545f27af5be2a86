use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farmledger_buildings::{Silo, validate_name};
use farmledger_core::{
    DomainError, DomainResult, Entity, FeedDeliveryId, FeedTypeId, FeedingChangeId, RoomId, SiloId,
};

/// A kind of feed and the age window it is meant for.
///
/// Ages are in days. A non-negative age counts from the flock's entry, a
/// negative one counts back from its expected exit date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedType {
    pub id: FeedTypeId,
    pub name: String,
    pub start_feeding_age: i64,
    pub stop_feeding_age: i64,
}

impl FeedType {
    pub fn new(name: impl Into<String>, start_feeding_age: i64, stop_feeding_age: i64) -> DomainResult<Self> {
        Ok(Self {
            id: FeedTypeId::new(),
            name: validate_name(name.into())?,
            start_feeding_age,
            stop_feeding_age,
        })
    }

    /// Whether a flock `age` days after entry and `past_exit` days after its
    /// expected exit (negative before it) is inside this type's window.
    pub fn suits(&self, age: i64, past_exit: i64) -> bool {
        let started = if self.start_feeding_age >= 0 {
            age >= self.start_feeding_age
        } else {
            past_exit >= self.start_feeding_age
        };
        let not_stopped = if self.stop_feeding_age > 0 {
            age <= self.stop_feeding_age
        } else {
            past_exit <= self.stop_feeding_age
        };
        started && not_stopped
    }
}

impl Entity for FeedType {
    type Id = FeedTypeId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Feed type a flock should get at `at`; the last matching type wins.
pub fn suggested_feed_type<'a>(
    feed_types: impl IntoIterator<Item = &'a FeedType>,
    entry_date: NaiveDate,
    expected_exit: NaiveDate,
    at: NaiveDate,
) -> Option<&'a FeedType> {
    let age = (at - entry_date).num_days();
    let past_exit = (at - expected_exit).num_days();
    feed_types
        .into_iter()
        .filter(|t| t.suits(age, past_exit))
        .last()
}

/// Feed delivered into a silo, with the weight still in the silo just
/// before the delivery was filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDelivery {
    pub id: FeedDeliveryId,
    pub date: NaiveDate,
    pub silo: SiloId,
    pub feed_type: FeedTypeId,
    /// Delivered weight (kg).
    pub weight: f64,
    /// Weight measured in the silo at delivery time (kg).
    pub remaining: f64,
}

impl FeedDelivery {
    pub fn new(date: NaiveDate, silo: SiloId, feed_type: FeedTypeId, weight: f64, remaining: f64) -> DomainResult<Self> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(DomainError::validation("delivered weight must be positive"));
        }
        if !(remaining.is_finite() && remaining >= 0.0) {
            return Err(DomainError::validation("remaining weight must not be negative"));
        }
        Ok(Self {
            id: FeedDeliveryId::new(),
            date,
            silo,
            feed_type,
            weight,
            remaining,
        })
    }

    /// Silo after the delivery (kg).
    pub fn stock(&self) -> f64 {
        self.weight + self.remaining
    }

    /// The silo must hold this feed type and fit the resulting stock.
    pub fn validate_for(&self, silo: &Silo) -> DomainResult<()> {
        if silo.id != self.silo {
            return Err(DomainError::validation("delivery belongs to another silo"));
        }
        if silo.feed_type != self.feed_type {
            return Err(DomainError::validation(format!(
                "silo {} does not hold this feed type",
                silo.name
            )));
        }
        if self.stock() > silo.capacity {
            return Err(DomainError::validation(format!(
                "{:.0} kg exceeds the capacity of silo {} ({:.0} kg)",
                self.stock(),
                silo.name,
                silo.capacity
            )));
        }
        Ok(())
    }
}

impl Entity for FeedDelivery {
    type Id = FeedDeliveryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// From `date` on, `room` is fed `feed_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomFeedingChange {
    pub id: FeedingChangeId,
    pub date: NaiveDate,
    pub room: RoomId,
    pub feed_type: FeedTypeId,
}

impl RoomFeedingChange {
    pub fn new(date: NaiveDate, room: RoomId, feed_type: FeedTypeId) -> Self {
        Self {
            id: FeedingChangeId::new(),
            date,
            room,
            feed_type,
        }
    }
}

impl Entity for RoomFeedingChange {
    type Id = FeedingChangeId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
