pub mod config;
pub mod credentials;
pub mod portal;
pub mod snapshot;

pub use config::{
    CacheConfig, Config, LogFormat, LoggingConfig, PortalConfig, RotationPolicy, ServerConfig,
};
pub use credentials::{AccessToken, Credentials};
pub use portal::{
    AcademicPeriod, AcademicReview, OpaqueId, ProgressDocument, ProgressModule, StudyProfile,
    WhoAmI,
};
pub use snapshot::{round2, AbsenceEntry, CourseUsage, Snapshot, UnavailableReason};
