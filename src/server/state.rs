use crate::analyzer::Analyzer;
use crate::providers::Provider;
use crate::settings;
use crate::translate::TranslationService;

pub(crate) struct ServerState<P: Provider, T: TranslationService> {
    pub(crate) settings: settings::Settings,
    /// Absent when no OpenRouter key was configured.
    pub(crate) analyzer: Option<Analyzer<P>>,
    pub(crate) translator: T,
}
