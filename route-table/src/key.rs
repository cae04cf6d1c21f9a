//! Composite row keys.

use std::fmt;

/// Composite key addressing a single row: `(project id, discriminator)`.
///
/// The discriminator is an event type for subscription rows and a source id
/// for source rows. Keys compare on both parts; [`Key::has_project`] matches
/// on the project part alone.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Key {
    project_id: String,
    discriminator: String,
}

impl Key {
    /// Create a key from a project id and a discriminator.
    pub fn new(project_id: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            discriminator: discriminator.into(),
        }
    }

    /// The project part of the key.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The event type or source id part of the key.
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Whether this key belongs to the given project.
    pub fn has_project(&self, project_id: &str) -> bool {
        self.project_id == project_id
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.discriminator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_equality() {
        assert_eq!(Key::new("p1", "a"), Key::new("p1", "a"));
        assert_ne!(Key::new("p1", "a"), Key::new("p1", "b"));
        assert_ne!(Key::new("p1", "a"), Key::new("p2", "a"));
    }

    #[test]
    fn test_project_match_is_exact() {
        let key = Key::new("project-10", "user.created");

        assert!(key.has_project("project-10"));
        // A project id that is a string prefix of another must not match it
        assert!(!key.has_project("project-1"));
    }

    #[test]
    fn test_key_display() {
        let key = Key::new("p1", "user.created");
        assert_eq!(key.to_string(), "p1:user.created");
        assert_eq!(key.project_id(), "p1");
        assert_eq!(key.discriminator(), "user.created");
    }
}
