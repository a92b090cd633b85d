pub mod dash_application;
