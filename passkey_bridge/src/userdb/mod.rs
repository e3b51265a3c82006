mod errors;
mod storage;
mod types;

pub use errors::UserError;
pub use storage::{
    DataStoreKind, InMemorySubjectStore, SqlxSubjectStore, SubjectStore, resolve_or_provision,
    subject_store_from_env,
};
pub use types::Subject;
