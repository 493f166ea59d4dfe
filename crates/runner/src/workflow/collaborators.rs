use autobake_core::{
    MetadataSource, NoopNotifier, Notifier, PackagingTool, RecipeExecutor, ReportSink,
    RepositoryRegistry, TrustAll, TrustVerifier,
};
use autobake_utils::JsonFileReportSink;
use std::sync::Arc;

/// External systems a workflow drives
///
/// The notifier, report sink and trust verifier are optional and default to
/// [`NoopNotifier`], [`JsonFileReportSink`] and [`TrustAll`].
#[derive(Clone)]
pub struct Collaborators {
    pub executor: Arc<dyn RecipeExecutor>,
    pub metadata: Arc<dyn MetadataSource>,
    pub repositories: Arc<dyn RepositoryRegistry>,
    pub packaging_tool: Arc<dyn PackagingTool>,
    pub notifier: Arc<dyn Notifier>,
    pub report_sink: Arc<dyn ReportSink>,
    pub trust_verifier: Arc<dyn TrustVerifier>,
}

impl Collaborators {
    pub fn new(
        executor: Arc<dyn RecipeExecutor>,
        metadata: Arc<dyn MetadataSource>,
        repositories: Arc<dyn RepositoryRegistry>,
        packaging_tool: Arc<dyn PackagingTool>,
    ) -> Self {
        Self {
            executor,
            metadata,
            repositories,
            packaging_tool,
            notifier: Arc::new(NoopNotifier),
            report_sink: Arc::new(JsonFileReportSink),
            trust_verifier: Arc::new(TrustAll),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = sink;
        self
    }

    pub fn with_trust_verifier(mut self, verifier: Arc<dyn TrustVerifier>) -> Self {
        self.trust_verifier = verifier;
        self
    }
}
