pub mod claim_check;
pub mod correlation;
pub mod ingestion;
pub mod queue;
pub mod retention;
pub mod status;
pub mod storage;
pub mod submission;
