pub mod attendance;
pub mod course;
pub mod section;
pub mod spacetime;
pub mod student;
pub mod user;

pub use attendance::{Attendance, AttendanceRef, Presence, RecordAttendanceRequest};
pub use course::{Coordinator, Course, NewCourseRequest};
pub use section::{
    Mentor, NewSectionRequest, Section, SectionDetail, SectionGroup, SectionsByDay,
    UpdateSectionRequest,
};
pub use spacetime::{
    DayOfWeek, Meeting, NewSpacetime, Override, OverrideRequest, Spacetime, SpacetimeView,
};
pub use student::{DropRequest, EnrollRequest, Enrollment, EnrollmentKind, Student};
pub use user::User;
