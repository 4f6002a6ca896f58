//! Query filter for audit entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::AuditLogEntry;
use crate::error::ValidationError;
use crate::taxonomy::{ActionType, AuditStatus, EntityType};

/// Criteria for reading the audit log.
///
/// Every field is optional and all set fields must match. The time range is
/// inclusive on both ends. `limit` is applied after filtering and keeps the
/// earliest matches in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action_type: Option<ActionType>,
    pub status: Option<AuditStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries about one entity instance
    pub fn for_entity(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id.into()),
            ..Default::default()
        }
    }

    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn by_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_action(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    pub fn with_status(mut self, status: AuditStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => {
                Err(ValidationError::InvalidTimeRange { from, to })
            }
            _ => Ok(()),
        }
    }

    /// Check if an entry matches every criterion except `limit`
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        let event = entry.event();

        if self.entity_type.is_some_and(|t| event.entity_type != t) {
            return false;
        }

        if self
            .entity_id
            .as_deref()
            .is_some_and(|id| event.entity_id.as_deref() != Some(id))
        {
            return false;
        }

        if self.actor_id.as_deref().is_some_and(|id| event.actor.id != id) {
            return false;
        }

        if self.action_type.is_some_and(|a| event.action_type != a) {
            return false;
        }

        if self.status.is_some_and(|s| event.status != s) {
            return false;
        }

        if self.from.is_some_and(|from| entry.timestamp() < from) {
            return false;
        }

        if self.to.is_some_and(|to| entry.timestamp() > to) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Actor, AuditEvent};
    use chrono::Duration;

    fn entry(actor: &str, action: ActionType, entity: EntityType, id: &str) -> AuditLogEntry {
        AuditLogEntry::from_event(
            AuditEvent::new(Actor::user(actor, "Someone"), action, entity).with_entity_id(id),
        )
    }

    #[test]
    fn test_default_filter_matches_everything() {
        let filter = AuditFilter::default();
        assert!(filter.matches(&entry("u1", ActionType::Create, EntityType::Firearm, "f-1")));
        assert!(filter.limit.is_none());
    }

    #[test]
    fn test_for_entity_requires_both_type_and_id() {
        let filter = AuditFilter::for_entity(EntityType::Firearm, "f-1");
        assert!(filter.matches(&entry("u1", ActionType::Update, EntityType::Firearm, "f-1")));
        assert!(!filter.matches(&entry("u1", ActionType::Update, EntityType::Firearm, "f-2")));
        assert!(!filter.matches(&entry("u1", ActionType::Update, EntityType::Magazine, "f-1")));
    }

    #[test]
    fn test_entity_id_filter_skips_entity_less_entries() {
        let filter = AuditFilter::new().with_entity_id("f-1");
        let entity_less = AuditLogEntry::from_event(AuditEvent::new(
            Actor::system("sys", "Scheduler"),
            ActionType::Update,
            EntityType::Ammunition,
        ));
        assert!(!filter.matches(&entity_less));
    }

    #[test]
    fn test_actor_action_and_status() {
        let filter = AuditFilter::new()
            .by_actor("u2")
            .with_action(ActionType::Delete)
            .with_status(AuditStatus::Success);
        assert!(filter.matches(&entry("u2", ActionType::Delete, EntityType::Depot, "d-1")));
        assert!(!filter.matches(&entry("u1", ActionType::Delete, EntityType::Depot, "d-1")));
        assert!(!filter.matches(&entry("u2", ActionType::Create, EntityType::Depot, "d-1")));
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let e = entry("u1", ActionType::Create, EntityType::Shipment, "s-1");
        let at = e.timestamp();
        assert!(AuditFilter::new().since(at).until(at).matches(&e));
        assert!(!AuditFilter::new().since(at + Duration::microseconds(1)).matches(&e));
        assert!(!AuditFilter::new().until(at - Duration::microseconds(1)).matches(&e));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let now = Utc::now();
        let filter = AuditFilter::new().since(now).until(now - Duration::hours(1));
        assert!(matches!(
            filter.validate(),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
        assert!(AuditFilter::new().since(now).validate().is_ok());
    }
}
