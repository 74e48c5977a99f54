//! Metadata carried by dependency-manager marker files.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::core::error::DetectionError;

static MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*module\s+(\S+)").expect("module regex is valid"));

static HEROKU_GO_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*//\s*\+heroku\s+goVersion\s+(\S+)").expect("goVersion regex is valid")
});

static HEROKU_INSTALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*//\s*\+heroku\s+install\s+(.+)$").expect("install regex is valid")
});

/// Fields read from `Godeps/Godeps.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Godeps {
    #[serde(rename = "ImportPath", default)]
    pub import_path: Option<String>,

    #[serde(rename = "GoVersion", default)]
    pub go_version: Option<String>,

    #[serde(rename = "Packages", default)]
    pub packages: Vec<String>,
}

/// Fields read from `glide.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GlideConfig {
    #[serde(default)]
    pub package: Option<String>,
}

/// Fields read from govendor's `vendor.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GovendorConfig {
    #[serde(rename = "rootPath", default)]
    pub root_path: Option<String>,
}

/// Fields read from `go.mod`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
    pub module: Option<String>,
    /// `// +heroku goVersion go1.12`, stored as `1.12`
    pub go_version: Option<String>,
    /// `// +heroku install ./cmd/...`
    pub install: Vec<String>,
}

fn read(path: &Path) -> Result<String, DetectionError> {
    std::fs::read_to_string(path).map_err(|e| DetectionError::Marker {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> DetectionError {
    DetectionError::Marker {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// `go1.12` -> `1.12`. Toolchain versions in the manifest carry no prefix.
fn strip_go_prefix(version: &str) -> String {
    let version = version.trim();
    version.strip_prefix("go").unwrap_or(version).to_string()
}

pub fn read_godeps(path: &Path) -> Result<Godeps, DetectionError> {
    let contents = read(path)?;
    let mut godeps: Godeps = serde_json::from_str(&contents).map_err(|e| malformed(path, e))?;
    godeps.go_version = godeps.go_version.as_deref().map(strip_go_prefix);
    Ok(godeps)
}

pub fn read_glide(path: &Path) -> Result<GlideConfig, DetectionError> {
    let contents = read(path)?;
    if contents.trim().is_empty() {
        return Ok(GlideConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| malformed(path, e))
}

pub fn read_govendor(path: &Path) -> Result<GovendorConfig, DetectionError> {
    let contents = read(path)?;
    serde_json::from_str(&contents).map_err(|e| malformed(path, e))
}

pub fn read_go_mod(path: &Path) -> Result<GoMod, DetectionError> {
    Ok(parse_go_mod(&read(path)?))
}

pub fn parse_go_mod(contents: &str) -> GoMod {
    let capture = |re: &Regex| {
        re.captures(contents)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches('"').to_string())
    };

    GoMod {
        module: capture(&MODULE_RE),
        go_version: capture(&HEROKU_GO_VERSION_RE).as_deref().map(strip_go_prefix),
        install: HEROKU_INSTALL_RE
            .captures(contents)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_go_mod() {
        let go_mod = parse_go_mod(
            r#"// +heroku goVersion go1.12
// +heroku install ./cmd/web ./cmd/worker
module github.com/full/path

require github.com/BurntSushi/toml v0.3.1
"#,
        );
        assert_eq!(go_mod.module.as_deref(), Some("github.com/full/path"));
        assert_eq!(go_mod.go_version.as_deref(), Some("1.12"));
        assert_eq!(go_mod.install, vec!["./cmd/web", "./cmd/worker"]);
    }

    #[test]
    fn test_parse_go_mod_without_directives() {
        let go_mod = parse_go_mod("module \"example.com/app\"\n\ngo 1.12\n");
        assert_eq!(go_mod.module.as_deref(), Some("example.com/app"));
        assert!(go_mod.go_version.is_none());
        assert!(go_mod.install.is_empty());
    }

    #[test]
    fn test_read_godeps() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Godeps.json");
        std::fs::write(
            &path,
            r#"{"ImportPath": "github.com/org/app", "GoVersion": "go1.11", "Packages": ["./..."], "Deps": []}"#,
        )
        .unwrap();

        let godeps = read_godeps(&path).unwrap();
        assert_eq!(godeps.import_path.as_deref(), Some("github.com/org/app"));
        assert_eq!(godeps.go_version.as_deref(), Some("1.11"));
        assert_eq!(godeps.packages, vec!["./..."]);
    }

    #[test]
    fn test_go_prefix_is_optional() {
        assert_eq!(strip_go_prefix("go99.99.99"), "99.99.99");
        assert_eq!(strip_go_prefix(" 1.12.x "), "1.12.x");
        let go_mod = parse_go_mod("// +heroku goVersion 1.13\nmodule example.com/app\n");
        assert_eq!(go_mod.go_version.as_deref(), Some("1.13"));
    }

    #[test]
    fn test_malformed_godeps_names_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Godeps.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = read_godeps(&path).unwrap_err();
        assert!(matches!(err, DetectionError::Marker { .. }));
        assert!(err.to_string().contains("Godeps.json"));
    }

    #[test]
    fn test_read_glide_and_govendor() {
        let tmp = TempDir::new().unwrap();
        let glide = tmp.path().join("glide.yaml");
        std::fs::write(&glide, "package: github.com/org/glider\nimport:\n- package: github.com/a/b\n")
            .unwrap();
        assert_eq!(
            read_glide(&glide).unwrap().package.as_deref(),
            Some("github.com/org/glider")
        );

        let vendor = tmp.path().join("vendor.json");
        std::fs::write(&vendor, r#"{"rootPath": "github.com/org/gv", "package": []}"#).unwrap();
        assert_eq!(
            read_govendor(&vendor).unwrap().root_path.as_deref(),
            Some("github.com/org/gv")
        );
    }
}
