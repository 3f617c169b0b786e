//! Collaborator traits the wizard engine calls through.
//!
//! Link-format parsing and HTTP fetching live outside the merge engine; the
//! engine only sees these narrow interfaces.

use async_trait::async_trait;
use crate::enums::LinkKind;
use crate::errors::Result;

/// Classifies lines of user input as subscription URLs or direct links.
///
/// Both predicates must be total and side-effect free.
pub trait LinkClassifier: Send + Sync {
    /// Whether the line is a subscription URL.
    fn is_subscription_url(&self, line: &str) -> bool;

    /// Whether the line is a direct connection link.
    fn is_direct_link(&self, line: &str) -> bool;

    /// Classify a single line. Subscription URLs take precedence.
    fn classify(&self, line: &str) -> LinkKind {
        if self.is_subscription_url(line) {
            LinkKind::Subscription
        } else if self.is_direct_link(line) {
            LinkKind::Direct
        } else {
            LinkKind::Unknown
        }
    }
}

/// Fetches the raw content behind a subscription URL.
#[async_trait]
pub trait SubscriptionFetcher: Send + Sync {
    /// Fetch and decode subscription content.
    ///
    /// Returns the decoded bytes or a descriptive failure.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
