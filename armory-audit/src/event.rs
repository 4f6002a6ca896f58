//! Audit events submitted by domain handlers

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::taxonomy::{ActionType, ActorType, AuditStatus, EntityType};

/// Identity credited with an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    /// Human-readable display name
    pub name: String,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
}

impl Actor {
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actor_type: ActorType::User,
        }
    }

    pub fn system(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actor_type: ActorType::System,
        }
    }
}

/// Everything a caller supplies about an action. The recorder adds the id and
/// timestamp when it becomes an [`AuditLogEntry`](crate::AuditLogEntry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub actor: Actor,
    pub action_type: ActionType,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub status: AuditStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditEvent {
    /// Create a successful event with no entity id or payload
    pub fn new(actor: Actor, action_type: ActionType, entity_type: EntityType) -> Self {
        Self {
            actor,
            action_type,
            entity_type,
            entity_id: None,
            status: AuditStatus::Success,
            details: None,
            previous_details: None,
            error_message: None,
        }
    }

    /// Create an event describing a failed action
    pub fn failure(
        actor: Actor,
        action_type: ActionType,
        entity_type: EntityType,
        error_message: impl Into<String>,
    ) -> Self {
        Self::new(actor, action_type, entity_type).failed(error_message)
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Record the entity state before an UPDATE
    pub fn with_previous_details(mut self, previous: Value) -> Self {
        self.previous_details = Some(previous);
        self
    }

    /// Mark the event as a failure carrying `error_message`
    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.status = AuditStatus::Failure;
        self.error_message = Some(error_message.into());
        self
    }

    /// Mark the event as successful, dropping any error message
    pub fn succeeded(mut self) -> Self {
        self.status = AuditStatus::Success;
        self.error_message = None;
        self
    }

    /// True when the action legitimately has no single target record.
    ///
    /// System actors run bulk and maintenance jobs that span many records, and
    /// a CREATE that failed never produced an id to reference.
    pub fn is_entity_less(&self) -> bool {
        self.actor.actor_type == ActorType::System
            || (self.action_type == ActionType::Create && self.status == AuditStatus::Failure)
    }

    /// Treat blank optional strings and null payloads as absent
    pub(crate) fn normalized(mut self) -> Self {
        self.entity_id = self.entity_id.filter(|id| !id.trim().is_empty());
        self.error_message = self.error_message.filter(|msg| !msg.trim().is_empty());
        self.details = self.details.filter(|details| !details.is_null());
        self.previous_details = self.previous_details.filter(|previous| !previous.is_null());
        self
    }

    /// Check the structural rules an entry must satisfy before it is written
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.actor.id.trim().is_empty() {
            return Err(ValidationError::MissingField("actor.id"));
        }
        if self.actor.name.trim().is_empty() {
            return Err(ValidationError::MissingField("actor.name"));
        }

        if self.status == AuditStatus::Failure && !has_text(&self.error_message) {
            return Err(ValidationError::MissingField("errorMessage"));
        }

        if self.previous_details.is_some() && self.action_type != ActionType::Update {
            return Err(ValidationError::UnexpectedField {
                field: "previousDetails",
                action: self.action_type,
            });
        }

        if !has_text(&self.entity_id) && !self.is_entity_less() {
            return Err(ValidationError::MissingField("entityId"));
        }

        Ok(())
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Actor as received from an untyped caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawActor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub actor_type: Option<String>,
}

/// An event as it arrives from a form handler, API body or the CLI: the
/// closed fields are still plain strings.
///
/// Convert with `AuditEvent::try_from`, which rejects anything outside the
/// taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuditEvent {
    #[serde(default)]
    pub actor: RawActor,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub previous_details: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TryFrom<RawAuditEvent> for AuditEvent {
    type Error = ValidationError;

    fn try_from(raw: RawAuditEvent) -> Result<Self, Self::Error> {
        let actor = Actor {
            id: required(raw.actor.id, "actor.id")?,
            name: required(raw.actor.name, "actor.name")?,
            actor_type: required(raw.actor.actor_type, "actor.type")?.parse()?,
        };

        Ok(AuditEvent {
            actor,
            action_type: required(raw.action_type, "actionType")?.parse()?,
            entity_type: required(raw.entity_type, "entityType")?.parse()?,
            entity_id: raw.entity_id,
            status: required(raw.status, "status")?.parse()?,
            details: raw.details,
            previous_details: raw.previous_details,
            error_message: raw.error_message,
        }
        .normalized())
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ValidationError::MissingField(field))
}
