use crate::workflows::repository::RepositoryError;

use super::domain::IntakeId;
use super::workflow::WorkflowRecord;

/// Storage abstraction so the service can be exercised without a database.
pub trait WorkflowRepository: Send + Sync {
    fn insert(&self, record: WorkflowRecord) -> Result<WorkflowRecord, RepositoryError>;
    /// Replaces the stored record only if its revision still equals `expected_revision`.
    fn update(&self, record: WorkflowRecord, expected_revision: u64)
        -> Result<(), RepositoryError>;
    fn fetch(&self, id: &IntakeId) -> Result<Option<WorkflowRecord>, RepositoryError>;
    /// Unsubmitted intakes, oldest first.
    fn open_intakes(&self, limit: usize) -> Result<Vec<WorkflowRecord>, RepositoryError>;
}
