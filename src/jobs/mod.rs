/// Background jobs
pub mod reconcile;
