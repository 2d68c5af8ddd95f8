pub mod responses;
pub mod stats;
pub mod submission;
pub mod validation;

pub use responses::ResponseRepository;
pub use stats::{Bucket, Stats};
pub use submission::{submit, SubmissionError};
pub use validation::{validate_submission, SubmissionRequest, ValidatedSubmission, ValidationError};
