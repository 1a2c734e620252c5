use serde::Deserialize;
use std::path::PathBuf;

/// Severity of a single diagnostic, as reported by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// Diagnostics currently attached to one file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileDiagnostics {
    pub path: PathBuf,
    #[serde(default)]
    pub severities: Vec<Severity>,
}

impl FileDiagnostics {
    pub fn has_errors(&self) -> bool {
        self.severities.contains(&Severity::Error)
    }
}

/// The most recent full diagnostic state reported by the host.
///
/// A "diagnostics changed" notification only says "recheck now"; the edge
/// detector re-queries this snapshot once the debounce period has passed.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    files: Vec<FileDiagnostics>,
}

impl DiagnosticsSnapshot {
    /// Replaces the whole snapshot.
    pub fn replace(&mut self, files: Vec<FileDiagnostics>) {
        self.files = files;
    }

    /// True if any file carries at least one error-severity diagnostic.
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(FileDiagnostics::has_errors)
    }

    pub fn error_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter().filter(|f| f.has_errors()).map(|f| &f.path)
    }
}

/// Two-state edge detector: Clean (no errors) or Broken (errors present).
///
/// Starts Clean, so nothing sounds until errors are actually observed.
#[derive(Debug, Default)]
pub struct DiagnosticsEdge {
    had_errors: bool,
}

impl DiagnosticsEdge {
    /// Feeds the current error state and returns true only on Clean → Broken.
    pub fn observe(&mut self, has_errors: bool) -> bool {
        let rising = has_errors && !self.had_errors;
        self.had_errors = has_errors;
        rising
    }

    #[cfg(test)]
    pub fn is_broken(&self) -> bool {
        self.had_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, severities: &[Severity]) -> FileDiagnostics {
        FileDiagnostics {
            path: PathBuf::from(path),
            severities: severities.to_vec(),
        }
    }

    #[test]
    fn fires_only_on_rising_edges() {
        let mut edge = DiagnosticsEdge::default();
        let fired: Vec<bool> = [false, true, true, false, true]
            .into_iter()
            .map(|has| edge.observe(has))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, true]);
    }

    #[test]
    fn starts_clean() {
        let edge = DiagnosticsEdge::default();
        assert!(!edge.is_broken());
    }

    #[test]
    fn repeated_identical_states_are_idempotent() {
        let mut edge = DiagnosticsEdge::default();
        assert!(edge.observe(true));
        for _ in 0..10 {
            assert!(!edge.observe(true));
        }
        assert!(edge.is_broken());
        assert!(!edge.observe(false));
        assert!(!edge.is_broken());
    }

    #[test]
    fn warnings_are_not_errors() {
        let mut snap = DiagnosticsSnapshot::default();
        snap.replace(vec![
            file("a.rs", &[Severity::Warning, Severity::Hint]),
            file("b.rs", &[Severity::Information]),
        ]);
        assert!(!snap.has_errors());
        assert_eq!(snap.error_files().count(), 0);
    }

    #[test]
    fn any_error_in_any_file_counts() {
        let mut snap = DiagnosticsSnapshot::default();
        snap.replace(vec![
            file("a.rs", &[Severity::Warning]),
            file("b.rs", &[Severity::Hint, Severity::Error]),
            file("c.rs", &[]),
        ]);
        assert!(snap.has_errors());
        let files: Vec<_> = snap.error_files().collect();
        assert_eq!(files, vec![&PathBuf::from("b.rs")]);
    }

    #[test]
    fn replace_drops_previous_state() {
        let mut snap = DiagnosticsSnapshot::default();
        snap.replace(vec![file("a.rs", &[Severity::Error])]);
        assert!(snap.has_errors());
        snap.replace(Vec::new());
        assert!(!snap.has_errors());
    }

    #[test]
    fn deserializes_host_payload() {
        let f: FileDiagnostics =
            serde_json::from_str(r#"{"path":"/src/main.rs","severities":["warning","error"]}"#)
                .unwrap();
        assert!(f.has_errors());
        let empty: FileDiagnostics = serde_json::from_str(r#"{"path":"x"}"#).unwrap();
        assert!(empty.severities.is_empty());
    }
}
