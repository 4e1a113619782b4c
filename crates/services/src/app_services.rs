use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::assessment_service::AssessmentService;
use crate::calibration::CalibrationService;
use crate::error::AppServicesError;
use crate::example_grading::ExampleGrader;

/// Assembles the grading services over one storage backend.
#[derive(Clone)]
pub struct GradingServices {
    calibration: Arc<CalibrationService>,
    assessments: Arc<AssessmentService>,
    example_grader: Arc<ExampleGrader>,
}

impl GradingServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let calibration = Arc::new(CalibrationService::new(
            clock,
            Arc::clone(&storage.submissions),
            Arc::clone(&storage.training),
        ));
        let assessments = Arc::new(AssessmentService::new(
            clock,
            Arc::clone(&storage.assessments),
        ));
        let example_grader = Arc::new(ExampleGrader::new(
            clock,
            Arc::clone(&storage.submissions),
            Arc::clone(&storage.assessments),
        ));

        Self {
            calibration,
            assessments,
            example_grader,
        }
    }

    #[must_use]
    pub fn calibration(&self) -> Arc<CalibrationService> {
        Arc::clone(&self.calibration)
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessments)
    }

    #[must_use]
    pub fn example_grader(&self) -> Arc<ExampleGrader> {
        Arc::clone(&self.example_grader)
    }
}
