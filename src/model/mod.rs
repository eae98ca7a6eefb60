pub mod agent;
pub mod queues;
