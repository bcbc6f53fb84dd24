//! SQL for each resource. Functions that take a generic executor run
//! equally against the pool or inside a transaction.

pub mod admissions;
pub mod appointments;
pub mod billing;
pub mod dashboard;
pub mod facilities;
pub mod lab;
pub mod patients;
pub mod pharmacy;
pub mod radiology;
pub mod users;
