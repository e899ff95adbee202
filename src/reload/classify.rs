//! File Classification
//!
//! Pure functions mapping a changed path to the action it implies.
//! No watcher machinery, no side effects.

use std::path::Path;

/// Action a filesystem change implies.
///
/// Variants are ordered by strength: merging two requests keeps the
/// stronger one, so a recompile is never downgraded to a plain restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    Ignore,
    RestartOnly,
    RecompileThenRestart,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::RestartOnly => "restart",
            Self::RecompileThenRestart => "recompile",
        }
    }
}

/// Classify a path against two extension lists.
///
/// A compile-extension match wins over a restart-extension match.
/// Matching is a case-sensitive suffix test of the file name against `".{ext}"`.
pub fn classify<S: AsRef<str>>(
    path: &Path,
    restart_extensions: &[S],
    compile_extensions: &[S],
) -> Classification {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Classification::Ignore;
    };

    if has_extension(name, compile_extensions) {
        Classification::RecompileThenRestart
    } else if has_extension(name, restart_extensions) {
        Classification::RestartOnly
    } else {
        Classification::Ignore
    }
}

fn has_extension<S: AsRef<str>>(name: &str, extensions: &[S]) -> bool {
    extensions.iter().any(|ext| {
        let ext = ext.as_ref();
        name.len() > ext.len()
            && name.ends_with(ext)
            && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
    })
}

/// Immutable extension lists captured at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRules {
    restart: Box<[String]>,
    compile: Box<[String]>,
}

impl ExtensionRules {
    pub fn new<I, J, S, T>(restart: I, compile: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            restart: restart.into_iter().map(Into::into).collect(),
            compile: compile.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn classify(&self, path: &Path) -> Classification {
        classify(path, &self.restart[..], &self.compile[..])
    }

    pub fn restart_extensions(&self) -> &[String] {
        &self.restart
    }

    pub fn compile_extensions(&self) -> &[String] {
        &self.compile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rules() -> ExtensionRules {
        ExtensionRules::new(["conf", "class"], ["java"])
    }

    #[test]
    fn test_scenario_java_conf_txt() {
        let rules = rules();
        assert_eq!(
            rules.classify(Path::new("App.java")),
            Classification::RecompileThenRestart
        );
        assert_eq!(
            rules.classify(Path::new("app.conf")),
            Classification::RestartOnly
        );
        assert_eq!(rules.classify(Path::new("notes.txt")), Classification::Ignore);
    }

    #[test]
    fn test_compile_wins_when_both_match() {
        let rules = ExtensionRules::new(["java", "conf"], ["java"]);
        assert_eq!(
            rules.classify(Path::new("src/main/java/App.java")),
            Classification::RecompileThenRestart
        );
    }

    #[test]
    fn test_every_compile_extension_recompiles() {
        let compile = ["java", "kt"];
        let restart = ["kt", "conf", "properties"];
        for ext in compile {
            let path = PathBuf::from(format!("/project/src/Main.{ext}"));
            assert_eq!(
                classify(&path, &restart, &compile),
                Classification::RecompileThenRestart,
                "{}",
                path.display()
            );
        }
    }

    #[test]
    fn test_restart_only_extensions() {
        let compile = ["java"];
        let restart = ["conf", "properties", "class"];
        for name in ["application.conf", "logback.properties", "App.class"] {
            assert_eq!(
                classify(Path::new(name), &restart, &compile),
                Classification::RestartOnly,
                "{name}"
            );
        }
    }

    #[test]
    fn test_unmatched_extensions_ignored() {
        let rules = rules();
        for name in ["README.md", "build.gradle", "conf", "Appjava", "App.JAVA"] {
            assert_eq!(rules.classify(Path::new(name)), Classification::Ignore, "{name}");
        }
    }

    #[test]
    fn test_multi_dot_suffix() {
        let rules = ExtensionRules::new(["tar.gz"], Vec::<String>::new());
        assert_eq!(
            rules.classify(Path::new("dist/app.tar.gz")),
            Classification::RestartOnly
        );
    }

    #[test]
    fn test_directory_path_without_name() {
        assert_eq!(rules().classify(Path::new("/")), Classification::Ignore);
    }

    #[test]
    fn test_ordering_is_monotonic() {
        assert!(Classification::RecompileThenRestart > Classification::RestartOnly);
        assert!(Classification::RestartOnly > Classification::Ignore);
        assert_eq!(
            Classification::RestartOnly.max(Classification::RecompileThenRestart),
            Classification::RecompileThenRestart
        );
    }
}
