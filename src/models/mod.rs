pub mod appointment;
pub mod cmj_test;
pub mod enums;
pub mod notification;
pub mod ocr_job;
pub mod physio;
pub mod player;
pub mod profile;
pub mod treatment;

pub use appointment::*;
pub use cmj_test::*;
pub use enums::*;
pub use notification::*;
pub use ocr_job::*;
pub use physio::*;
pub use player::*;
pub use profile::*;
pub use treatment::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// A row type that lives in exactly one table and is keyed by a UUID.
///
/// Change-feed subscriptions and session caches are generic over this.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + 'static {
    const TABLE: Table;

    fn id(&self) -> Uuid;
}

macro_rules! impl_record {
    ($ty:ty => $table:expr) => {
        impl Record for $ty {
            const TABLE: Table = $table;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

impl_record!(Player => Table::Players);
impl_record!(Profile => Table::Profiles);
impl_record!(CmjTest => Table::CmjTests);
impl_record!(PhysioAssessment => Table::PhysioAssessments);
impl_record!(DocumentationEntry => Table::PhysioDocumentation);
impl_record!(MedicalTreatment => Table::MedicalTreatments);
impl_record!(MedicalDocument => Table::MedicalDocuments);
impl_record!(Appointment => Table::Appointments);
impl_record!(OcrJob => Table::OcrJobs);
impl_record!(Notification => Table::Notifications);
