mod service;

// Public API of the calibration subsystem.
pub use crate::error::CalibrationError;
pub use service::CalibrationService;
