/// Where the relay lives and how this participant introduces itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:3000/ws`.
    pub url: String,
    pub display_label: String,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, display_label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_label: display_label.into(),
        }
    }
}
