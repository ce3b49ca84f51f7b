// Model exports
pub mod domain;
pub mod features;
pub mod raw;
pub mod requests;
pub mod responses;

pub use domain::{
    ApplicationRecord, CandidateRecord, JobRecord, Label, Language, ProficiencyLevel,
    ProfessionalLevel, SalaryRange,
};
pub use features::{FeatureMatrix, FeatureRow, FEATURE_COUNT, FEATURE_NAMES};
pub use raw::{ListOrText, NumberOrText, RawCandidate, RawJob, RawProspect};
pub use requests::{BatchPredictRequest, PredictRequest, PredictWithDataRequest};
pub use responses::{
    BatchPredictResponse, ErrorResponse, HealthResponse, MatchResponse, ModelInfoResponse,
};
