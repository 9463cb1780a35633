pub mod audio;
pub mod capture;
pub mod logging;
pub mod overlay;
pub mod script;
pub mod service;
pub mod settings;
pub mod toast_log;
