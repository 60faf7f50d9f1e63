pub mod cache;
pub mod chart;
pub mod model;
pub mod services;
pub mod tag;
pub mod task;
