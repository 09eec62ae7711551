//! Generator configuration.
//!
//! [`GeneratorConfig`] controls a single generation run. [`CodegenConfig`]
//! is the `arri.toml` file a build tool reads to run several backends
//! against one AppDefinition:
//!
//! ```toml
//! [[targets]]
//! backend = "typescript"
//! output = "client/src/api.ts"
//! client_name = "Api"
//!
//! [[targets]]
//! backend = "kotlin"
//! output = "android/Api.kt"
//! model_prefix = "Api"
//! indent = "spaces4"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::get_backend;
use crate::error::ConfigError;

/// Default configuration filename.
pub const CONFIG_FILENAME: &str = "arri.toml";

/// Options for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Name of the generated root client
    pub client_name: String,

    /// Prepended to every generated model name
    pub model_prefix: String,

    /// Whether to carry descriptions and deprecation into doc comments
    pub generate_docs: bool,

    /// Indentation style
    pub indent: IndentStyle,

    /// Line ending style
    pub line_ending: LineEnding,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            client_name: "Client".to_string(),
            model_prefix: String::new(),
            generate_docs: true,
            indent: IndentStyle::default(),
            line_ending: LineEnding::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_model_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.model_prefix = prefix.into();
        self
    }

    /// Set whether to generate documentation comments.
    pub fn with_generate_docs(mut self, generate: bool) -> Self {
        self.generate_docs = generate;
        self
    }

    pub fn with_indent(mut self, indent: IndentStyle) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

/// Indentation style for generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    #[default]
    Spaces2,
    Spaces4,
    Tabs,
}

impl IndentStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndentStyle::Spaces2 => "  ",
            IndentStyle::Spaces4 => "    ",
            IndentStyle::Tabs => "\t",
        }
    }

    /// Indentation for the given depth.
    pub fn indent(&self, depth: usize) -> String {
        self.as_str().repeat(depth)
    }
}

/// Line ending style for generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Rewrite `\n`-terminated text to this line ending.
    pub fn apply(&self, code: String) -> String {
        match self {
            LineEnding::Lf => code,
            LineEnding::CrLf => code.replace('\n', "\r\n"),
        }
    }
}

/// Contents of an `arri.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Path to the AppDefinition JSON document
    pub app_definition: Option<PathBuf>,

    pub targets: Vec<TargetConfig>,
}

/// One backend invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Registered backend name, e.g. `typescript`
    pub backend: String,

    /// Where the generated file goes
    pub output: PathBuf,

    #[serde(default)]
    pub client_name: Option<String>,

    #[serde(default)]
    pub model_prefix: Option<String>,

    #[serde(default)]
    pub generate_docs: Option<bool>,

    #[serde(default)]
    pub indent: Option<IndentStyle>,

    #[serde(default)]
    pub line_ending: Option<LineEnding>,
}

impl TargetConfig {
    pub fn new(backend: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            backend: backend.into(),
            output: output.into(),
            client_name: None,
            model_prefix: None,
            generate_docs: None,
            indent: None,
            line_ending: None,
        }
    }

    /// The run options for this target, defaults filled in.
    pub fn generator_config(&self) -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        if let Some(name) = &self.client_name {
            config.client_name.clone_from(name);
        }
        if let Some(prefix) = &self.model_prefix {
            config.model_prefix.clone_from(prefix);
        }
        if let Some(docs) = self.generate_docs {
            config.generate_docs = docs;
        }
        if let Some(indent) = self.indent {
            config.indent = indent;
        }
        if let Some(line_ending) = self.line_ending {
            config.line_ending = line_ending;
        }
        config
    }
}

impl CodegenConfig {
    /// Load and check a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content, path)?;

        // Relative document paths are relative to the config file.
        if let (Some(doc), Some(dir)) = (&config.app_definition, path.parent()) {
            if doc.is_relative() {
                config.app_definition = Some(dir.join(doc));
            }
        }
        Ok(config)
    }

    /// Parse and check config text. `path` is only used in error messages.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: CodegenConfig =
            toml::from_str(content).map_err(|e| ConfigError::InvalidToml {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.check()?;
        Ok(config)
    }

    /// Every target must name a registered backend.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        for target in &self.targets {
            if get_backend(&target.backend).is_none() {
                return Err(ConfigError::UnknownBackend {
                    output: target.output.display().to_string(),
                    backend: target.backend.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // =========================================================================
    // GeneratorConfig
    // =========================================================================

    #[test]
    fn test_generator_config_default() {
        let config = GeneratorConfig::default();
        assert_eq!(config.client_name, "Client");
        assert_eq!(config.model_prefix, "");
        assert!(config.generate_docs);
        assert_eq!(config.indent, IndentStyle::Spaces2);
        assert_eq!(config.line_ending, LineEnding::Lf);
    }

    #[test]
    fn test_generator_config_builder() {
        let config = GeneratorConfig::new()
            .with_client_name("Api")
            .with_model_prefix("Api")
            .with_generate_docs(false)
            .with_indent(IndentStyle::Tabs)
            .with_line_ending(LineEnding::CrLf);
        assert_eq!(config.client_name, "Api");
        assert_eq!(config.model_prefix, "Api");
        assert!(!config.generate_docs);
        assert_eq!(config.indent, IndentStyle::Tabs);
        assert_eq!(config.line_ending, LineEnding::CrLf);
    }

    #[test]
    fn test_indent_style() {
        assert_eq!(IndentStyle::Spaces2.as_str(), "  ");
        assert_eq!(IndentStyle::Spaces4.indent(2), "        ");
        assert_eq!(IndentStyle::Tabs.indent(3), "\t\t\t");
    }

    #[test]
    fn test_line_ending_apply() {
        assert_eq!(LineEnding::Lf.apply("a\nb\n".into()), "a\nb\n");
        assert_eq!(LineEnding::CrLf.apply("a\nb\n".into()), "a\r\nb\r\n");
    }

    // =========================================================================
    // CodegenConfig
    // =========================================================================

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
app_definition = "app.json"

[[targets]]
backend = "typescript"
output = "client/api.ts"
client_name = "Api"

[[targets]]
backend = "kotlin"
output = "android/Api.kt"
model_prefix = "Api"
indent = "spaces4"
line_ending = "crlf"
generate_docs = false
"#;
        let config = CodegenConfig::from_toml(toml, Path::new("arri.toml")).unwrap();
        assert_eq!(config.app_definition, Some(PathBuf::from("app.json")));
        assert_eq!(config.targets.len(), 2);

        let ts = config.targets[0].generator_config();
        assert_eq!(ts.client_name, "Api");
        assert_eq!(ts.indent, IndentStyle::Spaces2);

        let kt = config.targets[1].generator_config();
        assert_eq!(kt.client_name, "Client");
        assert_eq!(kt.model_prefix, "Api");
        assert_eq!(kt.indent, IndentStyle::Spaces4);
        assert_eq!(kt.line_ending, LineEnding::CrLf);
        assert!(!kt.generate_docs);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let toml = "[[targets]]\nbackend = \"cobol\"\noutput = \"out.cbl\"\n";
        let err = CodegenConfig::from_toml(toml, Path::new("arri.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend { ref backend, .. } if backend == "cobol"));
    }

    #[test]
    fn test_empty_config_rejected() {
        let err = CodegenConfig::from_toml("", Path::new("arri.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NoTargets));
    }

    #[test]
    fn test_invalid_toml_names_file() {
        let err = CodegenConfig::from_toml("[[targets]\n", Path::new("conf/arri.toml")).unwrap_err();
        assert!(err.to_string().contains("conf/arri.toml"));
    }

    #[test]
    fn test_load_resolves_document_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "app_definition = \"app.json\"\n\n[[targets]]\nbackend = \"dart\"\noutput = \"lib/api.dart\""
        )
        .unwrap();

        let config = CodegenConfig::load(&path).unwrap();
        assert_eq!(config.app_definition, Some(dir.path().join("app.json")));
        assert_eq!(config.targets[0].backend, "dart");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CodegenConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
