//! # Config
//!
//! Editor defaults, read from a TOML file in the user's preferences.

const DOCUMENTATION: &str = r#"# Rasterkit editor defaults. You may edit this file, but be aware that formatting and comments will not
# be preserved. Any missing key takes its default value.

# default_width, default_height: size of new documents, in pixels.
# layer_name_template: name of new layers, `{}` is replaced by the layer count.
# history_warning_bytes: warn once the undo history holds more than this many bytes.

"#;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config not accessible: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config not serializable: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no preferences directory found")]
    NoPreferencesDir,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(default)]
pub struct EditorConfig {
    pub default_width: u32,
    pub default_height: u32,
    pub layer_name_template: String,
    pub history_warning_bytes: usize,
}
impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_width: 64,
            default_height: 64,
            layer_name_template: "New Layer {}".to_owned(),
            history_warning_bytes: 512 * 1024 * 1024,
        }
    }
}

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

impl EditorConfig {
    pub const FILENAME: &'static str = "editor.toml";
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let string = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&string)?)
    }
    /// Load from `path`, falling back to defaults if it's missing or malformed.
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("editor config at {} not loaded, defaulting: {err}", path.display());
                Self::default()
            }
        }
    }
    /// Load from the user's preferences, or defaults.
    #[must_use]
    pub fn from_preferences() -> Self {
        let Some(mut path) = preferences_dir() else {
            log::warn!("no preferences dir, editor config defaulting.");
            return Self::default();
        };
        path.push(Self::FILENAME);
        Self::load_or_default(&path)
    }
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let mut string = toml::ser::to_string_pretty(self)?;
        // Prefix some documentation.
        string = DOCUMENTATION.to_owned() + &string;
        std::fs::write(path, string)?;
        Ok(())
    }
    /// Save into the user's preferences.
    pub fn save_to_preferences(&self) -> Result<(), ConfigError> {
        let mut preferences = preferences_dir().ok_or(ConfigError::NoPreferencesDir)?;
        // Only our own folder is created, never its parents. Failure here surfaces on write below.
        let _ = std::fs::DirBuilder::new().create(&preferences);
        preferences.push(Self::FILENAME);
        self.save(&preferences)
    }
    /// Name for the `count`th layer of a document.
    #[must_use]
    pub fn layer_name(&self, count: usize) -> String {
        self.layer_name_template.replace("{}", &count.to_string())
    }
}
