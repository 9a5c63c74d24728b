pub mod remote;
pub mod triage;
