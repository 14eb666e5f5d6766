pub mod job_description;
pub mod leave_request;
pub mod leave_type;
pub mod report;
