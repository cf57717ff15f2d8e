use crate::workflows::repository::RepositoryError;

use super::correction::RecordFamily;
use super::domain::{FamilyId, RecordId};

/// Storage for record families. Families are written whole.
pub trait PsdeRepository: Send + Sync {
    fn insert(&self, family: RecordFamily) -> Result<RecordFamily, RepositoryError>;
    /// Replaces the stored family only if its revision still equals `expected_revision`.
    fn update(&self, family: RecordFamily, expected_revision: u64) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &FamilyId) -> Result<Option<RecordFamily>, RepositoryError>;
    /// Family holding the given version, if any.
    fn find_by_record(&self, id: &RecordId) -> Result<Option<RecordFamily>, RepositoryError>;
}
