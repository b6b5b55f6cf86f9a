use std::sync::Arc;

use crate::media::{UploadRouter, UrlSigner};
use crate::store::DataStore;

/// Handles shared by every request handler. Built once at process start and
/// injected through the router, so tests can substitute in-memory fakes for
/// both the data store and the object store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub uploads: Arc<UploadRouter>,
    pub signer: Arc<UrlSigner>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DataStore>,
        uploads: Arc<UploadRouter>,
        signer: Arc<UrlSigner>,
    ) -> Self {
        Self {
            store,
            uploads,
            signer,
        }
    }
}
