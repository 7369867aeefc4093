pub mod dashboard_controller;
pub mod upload_controller;
