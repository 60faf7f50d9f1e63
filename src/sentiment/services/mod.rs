pub mod extract_service;
pub mod report_service;
pub mod series_service;
