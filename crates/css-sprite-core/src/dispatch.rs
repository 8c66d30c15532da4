use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use futures::future::try_join_all;
use tracing::{info, instrument};

use crate::descriptor::ImageDescriptor;
use crate::engine::{EngineOptions, PackRequest, PackedSheet, PackingEngine};
use crate::error::Result;
use crate::export::sprite_sheet_path;

/// Ordered group labels shared by every descriptor of one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&ImageDescriptor> for GroupKey {
    fn from(image: &ImageDescriptor) -> Self {
        Self(image.group.clone())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("(default)")
        } else {
            f.write_str(&self.0.join(", "))
        }
    }
}

/// One packed partition.
#[derive(Debug, Clone)]
pub struct PackingResult {
    pub group: GroupKey,
    /// Sheet path: the configured sheet name with the group labels spliced in.
    pub output_path: String,
    pub sheet: PackedSheet,
}

/// Split descriptors by their exact label sequence. Iteration order is the
/// key order, so the same input always yields the same partitions.
pub fn partition(images: &[ImageDescriptor]) -> BTreeMap<GroupKey, Vec<&ImageDescriptor>> {
    let mut partitions: BTreeMap<GroupKey, Vec<&ImageDescriptor>> = BTreeMap::new();
    for image in images {
        partitions.entry(GroupKey::from(image)).or_default().push(image);
    }
    partitions
}

/// Engine request for one partition: the base options with this partition's
/// unique paths, padding multiplied by the ratio when every member is retina
/// at one shared ratio.
pub fn pack_request(members: &[&ImageDescriptor], base: &EngineOptions) -> PackRequest {
    let mut seen = HashSet::new();
    let sources: Vec<PathBuf> = members
        .iter()
        .filter(|image| seen.insert(image.path.clone()))
        .map(|image| image.path.clone())
        .collect();

    let mut options = base.clone();
    if let Some(ratio) = uniform_retina_ratio(members) {
        options.padding = options.padding.saturating_mul(ratio);
    }
    PackRequest { sources, options }
}

fn uniform_retina_ratio(members: &[&ImageDescriptor]) -> Option<u32> {
    if members.is_empty() || !members.iter().all(|image| image.is_retina) {
        return None;
    }
    let ratio = members[0].retina_ratio;
    members
        .iter()
        .all(|image| image.retina_ratio == ratio)
        .then_some(ratio)
}

/// Pack every partition; partitions run concurrently and any failure aborts
/// the whole set.
pub async fn dispatch(
    images: &[ImageDescriptor],
    sheet_name: &str,
    base: &EngineOptions,
    engine: &dyn PackingEngine,
) -> Result<Vec<PackingResult>> {
    let jobs = partition(images).into_iter().map(|(group, members)| {
        let request = pack_request(&members, base);
        pack_partition(group, request, sheet_name, engine)
    });
    try_join_all(jobs).await
}

#[instrument(skip_all, fields(group = %group))]
async fn pack_partition(
    group: GroupKey,
    request: PackRequest,
    sheet_name: &str,
    engine: &dyn PackingEngine,
) -> Result<PackingResult> {
    info!(
        sources = request.sources.len(),
        padding = request.options.padding,
        "packing partition"
    );
    let sheet = engine.pack(request).await?;
    let output_path = sprite_sheet_path(sheet_name, &group);
    Ok(PackingResult {
        group,
        output_path,
        sheet,
    })
}
