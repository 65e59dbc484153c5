pub mod access;
pub mod attendance;
pub mod courses;
pub mod enrollment;
pub mod overrides;
pub mod schedule;
pub mod sections;

pub use access::{AccessService, Capability, Role, Scope};
pub use attendance::{AttendanceService, ReconcileStats};
pub use enrollment::EnrollmentService;
pub use overrides::{OverrideOutcome, OverrideService};
pub use sections::SectionService;
