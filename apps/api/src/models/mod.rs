pub mod plan;
pub mod profile;
pub mod stored_plan;
