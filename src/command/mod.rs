mod run;
mod status;

pub use crash_test::run_crash_test;
pub use run::run_startup;
pub use status::run_status;
