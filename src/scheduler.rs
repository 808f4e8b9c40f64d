//! Pickup scheduling for adopted dogs.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::SchedulerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pickup {
    pub dog_id: i64,
    pub dog_name: String,
    pub pickup_at: DateTime<Utc>,
}

/// Hands out pickup appointments a fixed delay after the request.
#[derive(Debug, Clone)]
pub struct PickupScheduler {
    delay: Duration,
}

impl PickupScheduler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(Duration::days(config.pickup_delay_days))
    }

    pub fn schedule(&self, dog_id: i64, dog_name: &str) -> Pickup {
        self.schedule_at(Utc::now(), dog_id, dog_name)
    }

    pub fn schedule_at(&self, now: DateTime<Utc>, dog_id: i64, dog_name: &str) -> Pickup {
        let pickup = Pickup {
            dog_id,
            dog_name: dog_name.to_string(),
            pickup_at: now + self.delay,
        };
        tracing::info!(
            dog_id,
            dog_name,
            pickup_at = %pickup.pickup_at.to_rfc3339(),
            "scheduled pickup"
        );
        pickup
    }
}

impl Default for PickupScheduler {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pickup_is_three_days_out() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let pickup = PickupScheduler::default().schedule_at(now, 4, "Prancer");
        assert_eq!(pickup.pickup_at.to_rfc3339(), "2024-05-04T10:00:00+00:00");
        assert_eq!(pickup.dog_id, 4);
        assert_eq!(pickup.dog_name, "Prancer");
    }

    #[test]
    fn schedule_uses_current_time() {
        let before = Utc::now();
        let pickup = PickupScheduler::new(Duration::hours(1)).schedule(1, "Rex");
        assert!(pickup.pickup_at >= before + Duration::hours(1));
        assert!(pickup.pickup_at <= Utc::now() + Duration::hours(1));
    }
}
