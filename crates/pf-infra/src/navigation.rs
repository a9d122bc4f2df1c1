use pf_core::navigation::Navigation;
use pf_core::ports::NavigatorPort;
use tokio::sync::mpsc;
use tracing::info;

/// Forwards navigation requests to whoever drives the session (the CLI).
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Navigation>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Navigation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NavigatorPort for ChannelNavigator {
    fn navigate(&self, navigation: Navigation) {
        info!(
            route = %navigation.route,
            replace = navigation.replace,
            "navigate"
        );
        if self.tx.send(navigation).is_err() {
            info!("navigation receiver dropped");
        }
    }
}
