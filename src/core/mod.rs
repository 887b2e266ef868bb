//! Core building blocks: area-of-interest validation, processing periods, season
//! advice, job requests and the pipeline threading them. Pure logic apart from the
//! collaborator calls made by `pipeline`.
pub mod extent;
pub mod params;
pub mod period;
pub mod pipeline;
pub mod request;
pub mod season;
