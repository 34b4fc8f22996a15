//! Resource registry

use crate::mcp::protocol::{Resource, ResourceContents};
use crate::types::{Result, RuntimeError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Produce the current text of the resource.
    async fn read(&self, uri: &str) -> anyhow::Result<String>;
}

struct FnResourceHandler<F>(F);

#[async_trait]
impl<F, Fut> ResourceHandler for FnResourceHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    async fn read(&self, _uri: &str) -> anyhow::Result<String> {
        (self.0)().await
    }
}

struct RegisteredResource {
    definition: Resource,
    handler: Arc<dyn ResourceHandler>,
}

#[derive(Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, RegisteredResource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: Resource, handler: Arc<dyn ResourceHandler>) {
        let uri = definition.uri.clone();
        if self.resources.contains_key(&uri) {
            warn!("Replacing already registered resource: {}", uri);
        }
        debug!("Registered resource: {}", uri);
        self.resources
            .insert(uri, RegisteredResource { definition, handler });
    }

    pub fn register_fn<F, Fut>(&mut self, definition: Resource, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.register(definition, Arc::new(FnResourceHandler(handler)));
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resource definitions sorted by URI.
    pub fn definitions(&self) -> Vec<Resource> {
        self.resources
            .values()
            .map(|r| r.definition.clone())
            .collect()
    }

    pub fn get(&self, uri: &str) -> Option<&Resource> {
        self.resources.get(uri).map(|r| &r.definition)
    }

    pub async fn read(&self, uri: &str) -> Result<ResourceContents> {
        let resource = self
            .resources
            .get(uri)
            .ok_or_else(|| RuntimeError::ResourceNotFound(uri.to_string()))?;

        let text = resource
            .handler
            .read(uri)
            .await
            .map_err(|cause| RuntimeError::ResourceFailed {
                uri: uri.to_string(),
                cause,
            })?;

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: resource.definition.mime_type.clone(),
            text,
        })
    }
}
