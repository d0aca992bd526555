//! Game Session Controller and results aggregation.

pub mod score;
pub mod session;
