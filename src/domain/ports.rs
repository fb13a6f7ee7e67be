use crate::domain::model::{LatLon, Record, ReportPaths, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Resolves a postal code to a coordinate pair.
///
/// `Ok(None)` means the service answered but had no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, postal_code: &str) -> Result<Option<LatLon>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<ReportPaths>;
}
