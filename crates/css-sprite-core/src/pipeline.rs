use std::path::PathBuf;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, error, instrument, warn};

use crate::config::SpriteConfig;
use crate::descriptor::{DescriptorBuilder, absolutize};
use crate::dispatch::dispatch;
use crate::engine::{ImageEngine, PackingEngine};
use crate::error::Result;
use crate::export::{Artifact, sheet_artifacts, stylesheet_artifact};
use crate::mapper::map_coordinates;
use crate::rewrite::Rewriter;
use crate::stage::{ImageFilter, ImageGrouper, Stages};

/// An input stylesheet. `contents: None` marks an entry without data; it is
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub contents: Option<Vec<u8>>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: Some(contents.into()),
        }
    }

    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: None,
        }
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Everything one document produced.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// The input, re-emitted unchanged.
    pub document: Document,
    pub sprite_sheets: Vec<Artifact>,
    /// Rewritten stylesheet; `None` when the document was passed through unprocessed.
    pub stylesheet: Option<Artifact>,
}

impl ProcessedDocument {
    fn passthrough(document: Document) -> Self {
        Self {
            document,
            sprite_sheets: Vec::new(),
            stylesheet: None,
        }
    }
}

/// Output channels of [`SpritePipeline::spawn`].
pub struct SpriteChannels {
    /// Input documents once fully processed, or the error that aborted them.
    pub documents: UnboundedReceiver<Result<Document>>,
    /// Rewritten stylesheets.
    pub css: UnboundedReceiver<Artifact>,
    /// Packed sprite sheets.
    pub img: UnboundedReceiver<Artifact>,
}

/// Turns stylesheets into sprite sheets plus rewritten stylesheets.
///
/// Holds only immutable state, so one pipeline can serve many documents at once.
pub struct SpritePipeline {
    config: SpriteConfig,
    stages: Stages,
    engine: Arc<dyn PackingEngine>,
    rewriter: Rewriter,
}

impl SpritePipeline {
    /// Pipeline with the built-in [`ImageEngine`] and no user stages.
    pub fn new(config: SpriteConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: SpriteConfig) -> SpritePipelineBuilder {
        SpritePipelineBuilder {
            config,
            filters: Vec::new(),
            groupers: Vec::new(),
            engine: None,
        }
    }

    pub fn config(&self) -> &SpriteConfig {
        &self.config
    }

    /// Process one document end to end.
    ///
    /// Returns the passthrough document with its sheets and rewritten
    /// stylesheet. Any stage, engine or rewrite failure aborts the document.
    #[instrument(skip_all, fields(document = %document.name()))]
    pub async fn process(&self, document: Document) -> Result<ProcessedDocument> {
        let Some(bytes) = document.contents.as_deref() else {
            debug!("no contents, passing through");
            return Ok(ProcessedDocument::passthrough(document));
        };
        let Ok(text) = std::str::from_utf8(bytes) else {
            warn!("contents are not UTF-8 text, passing through");
            return Ok(ProcessedDocument::passthrough(document));
        };

        let builder = DescriptorBuilder::new(&absolutize(&document.path)?, &self.config);
        let images = builder.collect(text)?;
        debug!(candidates = images.len(), "declarations extracted");

        let images = self.stages.run(images).await?;
        let results = dispatch(
            &images,
            self.config.sheet_name()?,
            &self.config.engine_options(),
            self.engine.as_ref(),
        )
        .await?;

        let sprite_sheets = sheet_artifacts(&results);
        let placed = map_coordinates(images, &results, self.config.sprite_sheet_path.as_deref());
        let content = self.rewriter.rewrite(text, &placed)?;

        let name = self
            .config
            .style_sheet_name
            .clone()
            .unwrap_or_else(|| document.name());
        let stylesheet = stylesheet_artifact(&name, content);
        Ok(ProcessedDocument {
            document,
            sprite_sheets,
            stylesheet: Some(stylesheet),
        })
    }

    /// Process a stream of documents concurrently.
    ///
    /// For each document the sheets go to `img`, then the stylesheet to `css`,
    /// then the document itself to `documents`. A failed document sends only
    /// its error. All channels close once the input stream is drained.
    pub fn spawn<S>(self: Arc<Self>, documents: S) -> SpriteChannels
    where
        S: Stream<Item = Document> + Send + 'static,
    {
        let (doc_tx, doc_rx) = unbounded_channel();
        let (css_tx, css_rx) = unbounded_channel();
        let (img_tx, img_rx) = unbounded_channel();
        tokio::spawn(async move {
            documents
                .for_each_concurrent(None, |document| {
                    let pipeline = Arc::clone(&self);
                    let (doc_tx, css_tx, img_tx) = (doc_tx.clone(), css_tx.clone(), img_tx.clone());
                    async move {
                        let path = document.path.clone();
                        match pipeline.process(document).await {
                            Ok(processed) => {
                                for sheet in processed.sprite_sheets {
                                    let _ = img_tx.send(sheet);
                                }
                                if let Some(css) = processed.stylesheet {
                                    let _ = css_tx.send(css);
                                }
                                let _ = doc_tx.send(Ok(processed.document));
                            }
                            Err(err) => {
                                error!(?path, error = %err, "sprite generation failed");
                                let _ = doc_tx.send(Err(err));
                            }
                        }
                    }
                })
                .await;
        });
        SpriteChannels {
            documents: doc_rx,
            css: css_rx,
            img: img_rx,
        }
    }
}

/// Registers user stages and the packing engine.
pub struct SpritePipelineBuilder {
    config: SpriteConfig,
    filters: Vec<Arc<dyn ImageFilter>>,
    groupers: Vec<Arc<dyn ImageGrouper>>,
    engine: Option<Arc<dyn PackingEngine>>,
}

impl SpritePipelineBuilder {
    /// Append a filter; filters run in registration order.
    pub fn filter(mut self, filter: impl ImageFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Arc<dyn ImageFilter>>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Append a grouper; groupers run in registration order after the built-ins.
    pub fn group_by(mut self, grouper: impl ImageGrouper + 'static) -> Self {
        self.groupers.push(Arc::new(grouper));
        self
    }

    pub fn groupers(mut self, groupers: impl IntoIterator<Item = Arc<dyn ImageGrouper>>) -> Self {
        self.groupers.extend(groupers);
        self
    }

    pub fn engine(mut self, engine: impl PackingEngine + 'static) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    pub fn shared_engine(mut self, engine: Arc<dyn PackingEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Validates the configuration and compiles the declaration template.
    pub fn build(self) -> Result<SpritePipeline> {
        self.config.validate()?;
        let rewriter = Rewriter::new(self.config.declaration_template.as_deref())?;
        let stages = Stages::new(&self.config, self.filters, self.groupers);
        Ok(SpritePipeline {
            stages,
            engine: self.engine.unwrap_or_else(|| Arc::new(ImageEngine)),
            rewriter,
            config: self.config,
        })
    }
}

