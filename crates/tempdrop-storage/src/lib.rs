//! Tempdrop Storage Library
//!
//! Client side of the hosted media store. Uploads go through an [`ObjectStore`];
//! deletes go through a [`RemoteDeleter`], which comes in two variants chosen
//! at configuration time:
//!
//! - [`LocalOnlyDeleter`]: credential-less deployments. Never contacts the provider
//!   and reports [`DeleteOutcome::LocalOnly`].
//! - [`SignedDeleter`]: trusted deployments holding the API secret. Issues a signed
//!   destroy request and reports [`DeleteOutcome::Removed`].
//!
//! [`batch_delete`] fans deletes out in bounded groups and never aborts on a single
//! failure.

pub mod batch;
pub mod cloudinary;
pub mod delete;
pub mod factory;
pub mod traits;

// Re-export commonly used types
pub use batch::{batch_delete, batch_delete_detailed, summarize, DeleteTarget, ItemOutcome};
pub use cloudinary::CloudinaryClient;
pub use delete::{resource_type_for, LocalOnlyDeleter, SignedDeleter};
pub use factory::{create_deleter, create_object_store};
pub use traits::{
    DeleteOutcome, ObjectStore, ProgressCallback, RemoteDeleter, StorageError, StorageResult,
    UploadedObject,
};
