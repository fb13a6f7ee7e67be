// Adapters layer: concrete implementations for external systems (storage, http).

pub mod geocoder;
pub mod storage;

pub use geocoder::OneMapGeocoder;
pub use storage::LocalStorage;
