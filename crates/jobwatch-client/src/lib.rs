pub mod extractor;
pub mod fetcher;
pub mod notifier;

#[cfg(test)]
mod test_server;

pub use extractor::SelectorExtractor;
pub use fetcher::ReqwestFetcher;
pub use notifier::{ClientNotifier, TracingNotifier, WebhookNotifier};
