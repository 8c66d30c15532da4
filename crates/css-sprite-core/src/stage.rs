//! Asynchronous filter and grouping stages.
//!
//! A filter decides whether a descriptor survives; a grouper may give it one
//! more group label. [`Stages`] runs each list strictly stage by stage, while
//! the descriptors inside one stage are evaluated concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::SpriteConfig;
use crate::descriptor::ImageDescriptor;
use crate::error::{Result, SpriteError, StageError};

/// Keeps descriptors for which `keep` resolves to `true`.
#[async_trait]
pub trait ImageFilter: Send + Sync {
    async fn keep(&self, image: &ImageDescriptor) -> std::result::Result<bool, StageError>;
}

/// Assigns at most one group label per descriptor.
#[async_trait]
pub trait ImageGrouper: Send + Sync {
    async fn group(&self, image: &ImageDescriptor)
    -> std::result::Result<Option<String>, StageError>;
}

/// Adapter turning a synchronous predicate into an [`ImageFilter`].
pub struct FilterFn<F>(F);

pub fn filter_fn<F>(f: F) -> FilterFn<F>
where
    F: Fn(&ImageDescriptor) -> bool + Send + Sync,
{
    FilterFn(f)
}

#[async_trait]
impl<F> ImageFilter for FilterFn<F>
where
    F: Fn(&ImageDescriptor) -> bool + Send + Sync,
{
    async fn keep(&self, image: &ImageDescriptor) -> std::result::Result<bool, StageError> {
        Ok((self.0)(image))
    }
}

/// Adapter turning a synchronous classifier into an [`ImageGrouper`].
pub struct GroupFn<F>(F);

pub fn group_fn<F>(f: F) -> GroupFn<F>
where
    F: Fn(&ImageDescriptor) -> Option<String> + Send + Sync,
{
    GroupFn(f)
}

#[async_trait]
impl<F> ImageGrouper for GroupFn<F>
where
    F: Fn(&ImageDescriptor) -> Option<String> + Send + Sync,
{
    async fn group(
        &self,
        image: &ImageDescriptor,
    ) -> std::result::Result<Option<String>, StageError> {
        Ok((self.0)(image))
    }
}

/// Drops descriptors whose meta annotation asks to be skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaSkipFilter;

#[async_trait]
impl ImageFilter for MetaSkipFilter {
    async fn keep(&self, image: &ImageDescriptor) -> std::result::Result<bool, StageError> {
        let skip = image.meta.is_skipped();
        if skip {
            info!(declaration = %image.matched_span, "skipped: meta declares skip");
        }
        Ok(!skip)
    }
}

/// Drops descriptors whose image file does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistingFileFilter;

#[async_trait]
impl ImageFilter for ExistingFileFilter {
    async fn keep(&self, image: &ImageDescriptor) -> std::result::Result<bool, StageError> {
        let exists = tokio::fs::try_exists(&image.path).await.unwrap_or(false);
        if !exists {
            info!(path = ?image.path, "skipped: file does not exist");
        }
        Ok(exists)
    }
}

/// Labels retina descriptors `@<ratio>x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetinaGrouper;

#[async_trait]
impl ImageGrouper for RetinaGrouper {
    async fn group(
        &self,
        image: &ImageDescriptor,
    ) -> std::result::Result<Option<String>, StageError> {
        Ok(image
            .is_retina
            .then(|| format!("@{}x", image.retina_ratio)))
    }
}

/// Ordered filter and grouper stages, built-ins included.
#[derive(Clone)]
pub struct Stages {
    filters: Vec<Arc<dyn ImageFilter>>,
    groupers: Vec<Arc<dyn ImageGrouper>>,
}

impl Stages {
    /// Wraps user stages with the built-ins: meta-skip first and file-exists
    /// last among filters; the retina grouper first when retina is enabled.
    pub fn new(
        config: &SpriteConfig,
        user_filters: Vec<Arc<dyn ImageFilter>>,
        user_groupers: Vec<Arc<dyn ImageGrouper>>,
    ) -> Self {
        let mut filters: Vec<Arc<dyn ImageFilter>> = Vec::with_capacity(user_filters.len() + 2);
        filters.push(Arc::new(MetaSkipFilter));
        filters.extend(user_filters);
        filters.push(Arc::new(ExistingFileFilter));

        let mut groupers: Vec<Arc<dyn ImageGrouper>> = Vec::with_capacity(user_groupers.len() + 1);
        if config.retina {
            groupers.push(Arc::new(RetinaGrouper));
        }
        groupers.extend(user_groupers);
        Self { filters, groupers }
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn grouper_count(&self) -> usize {
        self.groupers.len()
    }

    /// Filters, then groupers.
    pub async fn run(&self, images: Vec<ImageDescriptor>) -> Result<Vec<ImageDescriptor>> {
        let images = self.apply_filters(images).await?;
        self.apply_groupers(images).await
    }

    pub async fn apply_filters(
        &self,
        mut images: Vec<ImageDescriptor>,
    ) -> Result<Vec<ImageDescriptor>> {
        for (stage, filter) in self.filters.iter().enumerate() {
            if images.is_empty() {
                break;
            }
            let verdicts = try_join_all(images.iter().map(|image| filter.keep(image)))
                .await
                .map_err(|source| SpriteError::Filter { stage, source })?;
            images = images
                .into_iter()
                .zip(verdicts)
                .filter_map(|(image, keep)| keep.then_some(image))
                .collect();
            debug!(stage, remaining = images.len(), "filter stage done");
        }
        Ok(images)
    }

    pub async fn apply_groupers(
        &self,
        mut images: Vec<ImageDescriptor>,
    ) -> Result<Vec<ImageDescriptor>> {
        for (stage, grouper) in self.groupers.iter().enumerate() {
            if images.is_empty() {
                break;
            }
            let labels = try_join_all(images.iter().map(|image| grouper.group(image)))
                .await
                .map_err(|source| SpriteError::Grouper { stage, source })?;
            images = images
                .into_iter()
                .zip(labels)
                .map(|(image, label)| match label {
                    Some(label) if !label.is_empty() => image.with_group(label),
                    _ => image,
                })
                .collect();
            debug!(stage, "grouping stage done");
        }
        Ok(images)
    }
}
