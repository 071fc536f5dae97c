pub mod explorer;
pub mod gateway;
pub mod pricing;
pub mod setup;
pub mod workflow;
