mod s3_object_store;

pub use s3_object_store::{client_from_env, S3ObjectStore};
