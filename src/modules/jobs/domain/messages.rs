/// Typed job messages
///
/// Every job stored in the queue is one of these variants. The store only sees the
/// `(message_type, payload)` pair produced by `to_parts`.
use crate::modules::resources::domain::MidRefs;
use crate::shared::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub const ONBOARD_MIDS: &str = "OnboardMIDs";
pub const OFFBOARD_MIDS: &str = "OffboardMIDs";
pub const OFFBOARD_AND_DELETE_MIDS: &str = "OffboardAndDeleteMIDs";
pub const OFFBOARD_AND_DELETE_MERCHANT: &str = "OffboardAndDeleteMerchant";
pub const OFFBOARD_AND_DELETE_PLAN: &str = "OffboardAndDeletePlan";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMessage {
    OnboardMids(MidRefs),
    OffboardMids(MidRefs),
    OffboardAndDeleteMids(MidRefs),
    OffboardAndDeleteMerchant { plan_ref: Uuid, merchant_ref: Uuid },
    OffboardAndDeletePlan { plan_ref: Uuid },
}

#[derive(Serialize, Deserialize)]
struct MerchantPayload {
    plan_ref: Uuid,
    merchant_ref: Uuid,
}

#[derive(Serialize, Deserialize)]
struct PlanPayload {
    plan_ref: Uuid,
}

impl JobMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            JobMessage::OnboardMids(_) => ONBOARD_MIDS,
            JobMessage::OffboardMids(_) => OFFBOARD_MIDS,
            JobMessage::OffboardAndDeleteMids(_) => OFFBOARD_AND_DELETE_MIDS,
            JobMessage::OffboardAndDeleteMerchant { .. } => OFFBOARD_AND_DELETE_MERCHANT,
            JobMessage::OffboardAndDeletePlan { .. } => OFFBOARD_AND_DELETE_PLAN,
        }
    }

    pub fn payload(&self) -> AppResult<JsonValue> {
        let value = match self {
            JobMessage::OnboardMids(refs)
            | JobMessage::OffboardMids(refs)
            | JobMessage::OffboardAndDeleteMids(refs) => serde_json::to_value(refs)?,
            JobMessage::OffboardAndDeleteMerchant {
                plan_ref,
                merchant_ref,
            } => serde_json::to_value(MerchantPayload {
                plan_ref: *plan_ref,
                merchant_ref: *merchant_ref,
            })?,
            JobMessage::OffboardAndDeletePlan { plan_ref } => {
                serde_json::to_value(PlanPayload {
                    plan_ref: *plan_ref,
                })?
            }
        };
        Ok(value)
    }

    pub fn to_parts(&self) -> AppResult<(String, JsonValue)> {
        Ok((self.message_type().to_string(), self.payload()?))
    }

    /// Rebuild a message from its stored representation.
    ///
    /// Unknown tags (including the bulk import messages handled elsewhere) yield
    /// `InvalidOperation`, a malformed payload yields `SerializationError`.
    pub fn from_parts(message_type: &str, payload: &JsonValue) -> AppResult<Self> {
        let payload = payload.clone();
        match message_type {
            ONBOARD_MIDS => Ok(JobMessage::OnboardMids(serde_json::from_value(payload)?)),
            OFFBOARD_MIDS => Ok(JobMessage::OffboardMids(serde_json::from_value(payload)?)),
            OFFBOARD_AND_DELETE_MIDS => Ok(JobMessage::OffboardAndDeleteMids(
                serde_json::from_value(payload)?,
            )),
            OFFBOARD_AND_DELETE_MERCHANT => {
                let body: MerchantPayload = serde_json::from_value(payload)?;
                Ok(JobMessage::OffboardAndDeleteMerchant {
                    plan_ref: body.plan_ref,
                    merchant_ref: body.merchant_ref,
                })
            }
            OFFBOARD_AND_DELETE_PLAN => {
                let body: PlanPayload = serde_json::from_value(payload)?;
                Ok(JobMessage::OffboardAndDeletePlan {
                    plan_ref: body.plan_ref,
                })
            }
            other => Err(AppError::InvalidOperation(format!(
                "Unsupported message type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for JobMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobMessage::OnboardMids(refs)
            | JobMessage::OffboardMids(refs)
            | JobMessage::OffboardAndDeleteMids(refs) => {
                write!(f, "{}({} refs)", self.message_type(), refs.len())
            }
            JobMessage::OffboardAndDeleteMerchant { merchant_ref, .. } => {
                write!(f, "{}({})", self.message_type(), merchant_ref)
            }
            JobMessage::OffboardAndDeletePlan { plan_ref } => {
                write!(f, "{}({})", self.message_type(), plan_ref)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::resources::domain::MidKind;
    use serde_json::json;

    #[test]
    fn test_mid_messages_carry_refs_per_kind() {
        let mut refs = MidRefs::default();
        let primary = Uuid::new_v4();
        refs.push(MidKind::PrimaryMid, primary);

        let (message_type, payload) = JobMessage::OffboardAndDeleteMids(refs.clone())
            .to_parts()
            .unwrap();

        assert_eq!(message_type, "OffboardAndDeleteMIDs");
        assert_eq!(payload["primary_mid_refs"][0], json!(primary));
        assert_eq!(
            JobMessage::from_parts(&message_type, &payload).unwrap(),
            JobMessage::OffboardAndDeleteMids(refs)
        );
    }

    #[test]
    fn test_merchant_payload_shape() {
        let plan_ref = Uuid::new_v4();
        let merchant_ref = Uuid::new_v4();
        let payload = json!({ "plan_ref": plan_ref, "merchant_ref": merchant_ref });

        let message = JobMessage::from_parts("OffboardAndDeleteMerchant", &payload).unwrap();
        assert_eq!(
            message,
            JobMessage::OffboardAndDeleteMerchant {
                plan_ref,
                merchant_ref
            }
        );
    }

    #[test]
    fn test_missing_kind_lists_default_to_empty() {
        let message = JobMessage::from_parts("OnboardMIDs", &json!({})).unwrap();
        assert_eq!(message, JobMessage::OnboardMids(MidRefs::default()));
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let err = JobMessage::from_parts("ImportMerchants", &json!([])).unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[test]
    fn test_malformed_payload_is_serialization_error() {
        let err = JobMessage::from_parts("OffboardAndDeletePlan", &json!({"plan": 1})).unwrap_err();
        assert!(matches!(err, AppError::SerializationError(_)));
    }
}
