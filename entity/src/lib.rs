pub mod schools;
pub mod teacher_assignments;
