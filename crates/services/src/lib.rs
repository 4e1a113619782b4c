#![forbid(unsafe_code)]

pub mod app_services;
pub mod assessment_service;
pub mod calibration;
pub mod error;
pub mod example_grading;

pub use grading_core::Clock;

pub use app_services::GradingServices;
pub use assessment_service::{AssessmentRequest, AssessmentService};
pub use calibration::CalibrationService;
pub use error::{
    AppServicesError, AssessmentServiceError, CalibrationError, GradingError, RequestError,
};
pub use example_grading::{ClassifierSet, ExampleGrader, train_classifiers};
