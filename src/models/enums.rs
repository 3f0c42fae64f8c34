use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Admin => "admin",
    Trainer => "trainer",
    Physiotherapist => "physiotherapist",
    Physician => "physician",
});

str_enum!(OcrStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(DocumentType {
    PhysioAssessment => "physio_assessment",
    MedicalReport => "medical_report",
    LabResults => "lab_results",
    Radiology => "radiology",
    Generic => "generic",
});

str_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(NotificationType {
    CriticalValue => "critical_value",
    AppointmentOverdue => "appointment_overdue",
    AppointmentReminder => "appointment_reminder",
    TreatmentOverdue => "treatment_overdue",
    NewDocument => "new_document",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(Table {
    Players => "players",
    Profiles => "profiles",
    CmjTests => "cmj_tests",
    PhysioAssessments => "physio_assessments",
    PhysioDocumentation => "physio_documentation",
    MedicalTreatments => "medical_treatments",
    MedicalDocuments => "medical_documents",
    Appointments => "appointments",
    OcrJobs => "ocr_jobs",
    Notifications => "notifications",
});

impl OcrStatus {
    /// Forward-only lifecycle; `failed -> processing` is the retry edge.
    pub fn can_transition_to(self, next: OcrStatus) -> bool {
        matches!(
            (self, next),
            (OcrStatus::Pending, OcrStatus::Processing)
                | (OcrStatus::Processing, OcrStatus::Completed)
                | (OcrStatus::Processing, OcrStatus::Failed)
                | (OcrStatus::Failed, OcrStatus::Processing)
        )
    }
}

impl DocumentType {
    /// Unknown tags fall back to `Generic`, matching the intake form's default branch.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or(DocumentType::Generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_roundtrips_through_str() {
        for role in [Role::Admin, Role::Trainer, Role::Physiotherapist, Role::Physician] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_invalid_enum() {
        let err = Role::from_str("coach").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn ocr_status_allows_only_forward_moves_and_retry() {
        use OcrStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Processing));

        assert!(!Completed.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn unknown_document_tag_is_generic() {
        assert_eq!(DocumentType::from_tag("Röntgen"), DocumentType::Generic);
        assert_eq!(DocumentType::from_tag("lab_results"), DocumentType::LabResults);
    }

    #[test]
    fn enums_serialize_snake_case() {
        let json = serde_json::to_string(&NotificationType::AppointmentOverdue).unwrap();
        assert_eq!(json, "\"appointment_overdue\"");
        let json = serde_json::to_string(&DocumentType::PhysioAssessment).unwrap();
        assert_eq!(json, "\"physio_assessment\"");
    }
}
