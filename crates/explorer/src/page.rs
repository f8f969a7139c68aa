//! Wiring for a page of result tables that share facets and the URL.

use std::sync::Arc;

use facets::{ChangeOrigin, FacetForm, FacetSyncBus};
use parking_lot::Mutex;

use crate::api::ApiClient;
use crate::column::ColumnDescriptor;
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::filter::URL_PARAM_LINEAGE;
use crate::table::{ServerTable, ServerTableBuilder};
use crate::url_state::{Location, UrlStateStore};

/// Shared services for every table and facet form on one page.
#[derive(Clone)]
pub struct ExplorerPage {
    config: ExplorerConfig,
    client: ApiClient,
    bus: FacetSyncBus,
    url_store: Option<UrlStateStore>,
    /// Mount id of the table persisted in the URL.
    url_owner: Arc<Mutex<Option<String>>>,
}

impl ExplorerPage {
    pub fn new(config: ExplorerConfig) -> Result<Self> {
        let client = ApiClient::new(&config)?;
        Ok(Self {
            config,
            client,
            bus: FacetSyncBus::new(),
            url_store: None,
            url_owner: Arc::new(Mutex::new(None)),
        })
    }

    /// Tables built afterwards seed from and write back to `location`.
    pub fn with_location(mut self, location: Arc<dyn Location>) -> Self {
        self.url_store = Some(UrlStateStore::new(location));
        self
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn bus(&self) -> &FacetSyncBus {
        &self.bus
    }

    pub fn url_store(&self) -> Option<&UrlStateStore> {
        self.url_store.as_ref()
    }

    /// A facet form on the page's sync bus.
    pub fn facet_form(&self, form_id: impl Into<String>) -> FacetForm {
        FacetForm::new(form_id, &self.bus)
    }

    /// A table over one API resource, configured from the page.
    ///
    /// The table does not touch the page URL; see [`ExplorerPage::url_table`].
    pub fn server_table(
        &self,
        mount_id: impl Into<String>,
        resource: &str,
        columns: Vec<ColumnDescriptor>,
    ) -> ServerTableBuilder {
        let fetcher = self.client.resource(resource, columns.clone());
        ServerTable::builder(mount_id, columns, fetcher).config(&self.config)
    }

    /// Like [`ExplorerPage::server_table`], but the table seeds from and
    /// writes back to the page URL.
    ///
    /// The URL holds one table's state, so only one mount id may claim it.
    /// Without a location this is a plain table.
    pub fn url_table(
        &self,
        mount_id: impl Into<String>,
        resource: &str,
        columns: Vec<ColumnDescriptor>,
    ) -> Result<ServerTableBuilder> {
        let mount_id = mount_id.into();
        let Some(store) = &self.url_store else {
            return Ok(self.server_table(mount_id, resource, columns));
        };
        {
            let mut owner = self.url_owner.lock();
            match owner.as_deref() {
                Some(current) if current != mount_id => {
                    return Err(ExplorerError::InvalidInput(format!(
                        "page url already belongs to table {current}"
                    )));
                }
                Some(_) => {}
                None => *owner = Some(mount_id.clone()),
            }
        }
        Ok(self
            .server_table(mount_id, resource, columns)
            .url_store(store.clone()))
    }

    /// Checks the lineage values named in the URL on `form`.
    ///
    /// Applied as sync changes, so nothing is re-broadcast; every form on
    /// the page is expected to be seeded the same way. Returns how many
    /// values were applied.
    pub fn seed_form_from_url(&self, form: &FacetForm) -> usize {
        let Some(lineage) = self
            .url_store
            .as_ref()
            .and_then(|store| store.read().remove(URL_PARAM_LINEAGE))
        else {
            return 0;
        };

        let mut applied = 0;
        for value in lineage.split(',').map(str::trim).filter(|v| !v.is_empty()) {
            match form.set_checked(URL_PARAM_LINEAGE, value, true, ChangeOrigin::Sync) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(error) => {
                    tracing::debug!(
                        "form {}: ignoring url lineage {}: {}",
                        form.form_id(),
                        value,
                        error
                    );
                }
            }
        }
        applied
    }
}
