/// Tag a target declares to opt into in-place change notifications.
pub const NOTIFY_TAG: &str = "ibazel_notify_changes";

/// Rule metadata for one target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rule {
    pub name: String,
    /// Rule class, e.g. `go_binary`.
    pub kind: String,
    pub tags: Vec<String>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the target asked to be notified instead of restarted.
    pub fn wants_notifications(&self) -> bool {
        self.has_tag(NOTIFY_TAG)
    }
}
