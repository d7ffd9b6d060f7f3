//! Centralized viewer options with TOML preset support.
//!
//! Camera feel, post-processing, display, framing and key bindings are
//! consolidated here. Options serialize to/from TOML so view presets can be
//! stored next to the application; [`Options::production`] and
//! [`Options::test_scene`] are the two built-in presets.

mod camera;
mod display;
mod framing;
mod keybindings;
mod post_processing;

use std::path::Path;

pub use camera::CameraOptions;
pub use display::DisplayOptions;
pub use framing::FramingOptions;
pub use keybindings::KeybindingOptions;
pub use post_processing::{PostEffectKind, PostProcessingOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[camera]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Camera projection and orbit control parameters.
    pub camera: CameraOptions,
    /// Post-processing chain and effect parameters.
    pub post_processing: PostProcessingOptions,
    /// Background and frame pacing.
    pub display: DisplayOptions,
    /// Auto-framing behavior.
    pub framing: FramingOptions,
    /// Keyboard binding options.
    #[schemars(skip)]
    pub keybindings: KeybindingOptions,
}

impl Options {
    /// Damped, narrow-angle camera with SSAO and bloom.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Wide-angle undamped camera with FXAA only, for test scenes.
    #[must_use]
    pub fn test_scene() -> Self {
        Self {
            camera: CameraOptions {
                fovy: 75.0,
                damping_factor: 0.0,
                rotate_speed: 1.5,
                zoom_speed: 2.0,
                ..CameraOptions::default()
            },
            post_processing: PostProcessingOptions {
                effects: vec![PostEffectKind::Fxaa],
                ..PostProcessingOptions::default()
            },
            ..Self::default()
        }
    }

    /// Built-in preset by name: `production`, or `test` / `test_scene`.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "production" => Some(Self::production()),
            "test" | "test_scene" => Some(Self::test_scene()),
            _ => None,
        }
    }

    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`ViewerError::OptionsParse`] for malformed TOML or mistyped fields.
    pub fn from_toml(content: &str) -> Result<Self, ViewerError> {
        toml::from_str(content)
            .map_err(|e| ViewerError::OptionsParse(e.to_string()))
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Io`] if the file cannot be read, or
    /// [`ViewerError::OptionsParse`] if its contents do not parse.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let content = std::fs::read_to_string(path).map_err(ViewerError::Io)?;
        let options = Self::from_toml(&content)?;
        log::debug!("loaded options from {}", path.display());
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`ViewerError::OptionsParse`] if serialization fails, or
    /// [`ViewerError::Io`] if the file or its parent directory cannot be
    /// written.
    pub fn save(&self, path: &Path) -> Result<(), ViewerError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ViewerError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ViewerError::Io)?;
        }
        std::fs::write(path, content).map_err(ViewerError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyAction;

    #[test]
    fn default_round_trips_through_toml() {
        for opts in [Options::production(), Options::test_scene()] {
            let toml_str = toml::to_string_pretty(&opts).unwrap();
            let parsed = Options::from_toml(&toml_str).unwrap();
            assert_eq!(opts, parsed);
        }
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[camera]
fovy = 50.0

[post_processing]
effects = ["fxaa", "bloom"]
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.camera.fovy, 50.0);
        assert_eq!(
            opts.post_processing.effects,
            [PostEffectKind::Fxaa, PostEffectKind::Bloom]
        );
        // Everything else should be default
        assert_eq!(opts.camera.damping_factor, 0.1);
        assert!(opts.post_processing.enabled);
        assert_eq!(opts.display.background, [1.0, 1.0, 1.0]);
        assert_eq!(opts.framing.default_direction, [0.0, 0.0, -1.0]);
        assert_eq!(opts.keybindings.lookup("KeyF"), Some(KeyAction::FocusScene));
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        let err = Options::from_toml("[camera]\nfovy = \"wide\"").unwrap_err();
        assert!(matches!(err, ViewerError::OptionsParse(_)));
    }

    #[test]
    fn presets_differ_in_feel_and_effects() {
        let production = Options::production();
        let test = Options::test_scene();
        assert_eq!(production.camera.fovy, 30.0);
        assert_eq!(production.camera.zoom_speed, 3.0);
        assert_eq!(
            production.post_processing.effects,
            [PostEffectKind::Ssao, PostEffectKind::Bloom]
        );
        assert_eq!(test.camera.fovy, 75.0);
        assert_eq!(test.camera.damping_factor, 0.0);
        assert_eq!(test.camera.zoom_speed, 2.0);
        assert_eq!(test.post_processing.effects, [PostEffectKind::Fxaa]);

        assert_eq!(Options::preset("test"), Some(test));
        assert_eq!(Options::preset("production"), Some(production));
        assert_eq!(Options::preset("cinematic"), None);
    }

    #[test]
    fn custom_keybindings_load() {
        let toml_str = r#"
[keybindings.bindings]
focus_scene = "Space"
toggle_post_processing = "KeyX"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.keybindings.lookup("Space"), Some(KeyAction::FocusScene));
        assert_eq!(
            opts.keybindings.lookup("KeyX"),
            Some(KeyAction::TogglePostProcessing)
        );
        assert_eq!(opts.keybindings.lookup("KeyF"), None);
    }

    #[test]
    fn save_then_load_and_list() {
        let dir = std::env::temp_dir()
            .join(format!("orbview-options-{}", std::process::id()));
        let opts = Options::test_scene();
        opts.save(&dir.join("test.toml")).unwrap();
        Options::production().save(&dir.join("production.toml")).unwrap();

        assert_eq!(Options::load(&dir.join("test.toml")).unwrap(), opts);
        assert_eq!(Options::list_presets(&dir), ["production", "test"]);
        assert!(matches!(
            Options::load(&dir.join("missing.toml")),
            Err(ViewerError::Io(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("camera"));
        assert!(props.contains_key("post_processing"));
        assert!(props.contains_key("display"));
        assert!(props.contains_key("framing"));
        assert!(!props.contains_key("keybindings"));

        let camera = &props["camera"]["properties"];
        assert!(camera.get("fovy").is_some());
        assert!(camera.get("damping_factor").is_some());
        assert!(camera.get("znear").is_none());
    }
}
