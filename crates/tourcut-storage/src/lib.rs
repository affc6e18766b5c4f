//! S3-compatible cloud delivery for rendered tour videos.
//!
//! Uploads the final render to the studio's delivery bucket and
//! produces the shareable link handed to the patron. Delivery is
//! optional: when the bucket is not configured the pipeline finishes
//! without a link.

pub mod client;
pub mod error;

pub use client::{DeliveryClient, DeliveryConfig};
pub use error::{StorageError, StorageResult};
