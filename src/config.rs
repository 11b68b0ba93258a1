//! Template configuration (`config.toml`)
//!
//! A configuration names color palettes, the stylable attributes of the
//! template (which nodes they select and how their style string is built),
//! and the styles whose color combinations get rendered.
//!
//! ```toml
//! file_prefix = "logo"
//! namespace = "http://www.w3.org/2000/svg"
//!
//! [palette.brand]
//! red = "#ff0000"
//! blue = "#0000ff"
//!
//! [attribute.background]
//! name = "{color_key}_bg"
//! xpath = ".//{{{namespace}}}rect[@id='background']"
//! style = "fill:{color_value}"
//!
//! [[style]]
//! name = "Background"
//! attribute = [{ id = "background", palette = "brand" }]
//! ```
//!
//! Palettes keep their declaration order, which fixes the enumeration order
//! of combinations.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::format::{self, FormatError};
use crate::svg::{ElementPath, PathError};

/// File name of the configuration inside a template directory
pub const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur when loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("style '{style}' references unknown attribute '{id}'")]
    UnknownAttribute { style: String, id: String },

    #[error("style '{style}' references unknown palette '{palette}'")]
    UnknownPalette { style: String, palette: String },

    #[error("style '{style}' declares no attributes")]
    EmptyStyle { style: String },

    #[error("attribute '{id}' has a bad {field} template: {source}")]
    Template {
        id: String,
        field: &'static str,
        source: FormatError,
    },

    #[error("attribute '{id}' has an invalid path '{expression}': {source}")]
    Path {
        id: String,
        expression: String,
        source: PathError,
    },
}

/// One named color of a palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    pub key: String,
    pub value: String,
}

/// Named, ordered set of colors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub name: String,
    pub colors: Vec<PaletteColor>,
}

/// A stylable attribute of the template
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeSpec {
    /// Label template, expanded with `{color_key}`
    pub name: String,
    /// Path template, expanded with `{namespace}`
    pub xpath: String,
    /// Style template, expanded with `{color_value}`
    pub style: String,
}

impl AttributeSpec {
    /// Human-readable label for this attribute in the given color
    pub fn label(&self, color_key: &str) -> Result<String, FormatError> {
        format::format(&self.name, &[("color_key", color_key)])
    }
}

/// Binding of an attribute slot to a palette
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeRef {
    pub id: String,
    pub palette: String,
}

/// A named group of attribute slots whose color combinations are rendered
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleSpec {
    pub name: String,
    #[serde(rename = "attribute")]
    pub attributes: Vec<AttributeRef>,
}

/// How the template tree evolves between combinations of a style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationMode {
    /// Every combination starts from the pristine template
    #[default]
    Fresh,
    /// Each combination builds on the previous one's changes
    Cumulative,
}

/// Optional `[output]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
    /// Figures per row in the report table
    pub columns: usize,
    /// Prefix of image URLs in the report, relative to the report file
    pub image_url_prefix: String,
    pub mutation: MutationMode,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: 3840,
            height: 2160,
            columns: 3,
            image_url_prefix: "../../assets/pngs".to_string(),
            mutation: MutationMode::Fresh,
        }
    }
}

/// A validated template configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub file_prefix: String,
    pub namespace: String,
    pub palettes: Vec<Palette>,
    pub attributes: Vec<(String, AttributeSpec)>,
    pub styles: Vec<StyleSpec>,
    pub output: OutputSettings,
}

/// TOML structure for deserializing configurations
#[derive(Deserialize)]
struct TomlConfig {
    file_prefix: String,
    namespace: String,
    #[serde(default)]
    palette: toml::Table,
    #[serde(default)]
    attribute: toml::Table,
    #[serde(default)]
    style: Vec<StyleSpec>,
    #[serde(default)]
    output: OutputSettings,
}

impl Config {
    /// Load `config.toml` from a template directory
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Self::from_file(&dir.join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;

        let palettes = parsed
            .palette
            .into_iter()
            .map(|(name, value)| palette_from_toml(name, value))
            .collect::<Result<Vec<_>, _>>()?;

        let attributes = parsed
            .attribute
            .into_iter()
            .map(|(id, value)| {
                let spec: AttributeSpec = value.try_into().map_err(|e: toml::de::Error| {
                    ConfigError::Invalid(format!("attribute '{}': {}", id, e.message()))
                })?;
                Ok((id, spec))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let config = Config {
            file_prefix: parsed.file_prefix,
            namespace: parsed.namespace,
            palettes,
            attributes,
            styles: parsed.style,
            output: parsed.output,
        };
        config.validate()?;
        Ok(config)
    }

    /// Look up a palette by name
    pub fn palette(&self, name: &str) -> Option<&Palette> {
        self.palettes.iter().find(|p| p.name == name)
    }

    /// Look up an attribute descriptor by id
    pub fn attribute(&self, id: &str) -> Option<&AttributeSpec> {
        self.attributes
            .iter()
            .find(|(attribute_id, _)| attribute_id == id)
            .map(|(_, spec)| spec)
    }

    /// Check cross references and templates
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.width == 0 || self.output.height == 0 {
            return Err(ConfigError::Invalid(
                "output width/height must be non-zero".to_string(),
            ));
        }
        if self.output.columns == 0 {
            return Err(ConfigError::Invalid(
                "output columns must be non-zero".to_string(),
            ));
        }

        for (id, spec) in &self.attributes {
            let template_error = |field, source| ConfigError::Template {
                id: id.clone(),
                field,
                source,
            };
            format::check(&spec.name, &["color_key"]).map_err(|e| template_error("name", e))?;
            format::check(&spec.style, &["color_value"]).map_err(|e| template_error("style", e))?;
            let expression = format::format(&spec.xpath, &[("namespace", self.namespace.as_str())])
                .map_err(|e| template_error("xpath", e))?;
            ElementPath::parse(&expression).map_err(|source| ConfigError::Path {
                id: id.clone(),
                expression: expression.clone(),
                source,
            })?;
        }

        for style in &self.styles {
            if style.attributes.is_empty() {
                return Err(ConfigError::EmptyStyle {
                    style: style.name.clone(),
                });
            }
            for slot in &style.attributes {
                if self.attribute(&slot.id).is_none() {
                    return Err(ConfigError::UnknownAttribute {
                        style: style.name.clone(),
                        id: slot.id.clone(),
                    });
                }
                if self.palette(&slot.palette).is_none() {
                    return Err(ConfigError::UnknownPalette {
                        style: style.name.clone(),
                        palette: slot.palette.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn palette_from_toml(name: String, value: toml::Value) -> Result<Palette, ConfigError> {
    let toml::Value::Table(table) = value else {
        return Err(ConfigError::Invalid(format!(
            "palette '{}' must be a table of colors",
            name
        )));
    };

    let colors = table
        .into_iter()
        .map(|(key, value)| match value {
            toml::Value::String(value) => Ok(PaletteColor { key, value }),
            other => Err(ConfigError::Invalid(format!(
                "color '{}' in palette '{}' must be a string, found {}",
                key,
                name,
                other.type_str()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Palette { name, colors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r##"
file_prefix = "logo"
namespace = "http://www.w3.org/2000/svg"

[palette.warm]
yellow = "#ffff00"
red = "#ff0000"
orange = "#ff8800"

[palette.mono]
white = "#ffffff"
black = "#000000"

[attribute.bg]
name = "{color_key}_bg"
xpath = ".//{{{namespace}}}rect[@id='background']"
style = "fill:{color_value}"

[attribute.fg]
name = "{color_key}"
xpath = ".//{{{namespace}}}path"
style = "fill:{color_value};stroke:none"

[[style]]
name = "Warm on mono"
attribute = [{ id = "fg", palette = "warm" }, { id = "bg", palette = "mono" }]
"##;

    #[test]
    fn test_parse_config() {
        let config = Config::from_str(CONFIG).expect("Should parse");
        assert_eq!(config.file_prefix, "logo");
        assert_eq!(config.namespace, "http://www.w3.org/2000/svg");
        assert_eq!(config.styles.len(), 1);
        assert_eq!(config.styles[0].attributes[1].palette, "mono");
        assert_eq!(config.output, OutputSettings::default());
    }

    #[test]
    fn test_palette_declaration_order_preserved() {
        let config = Config::from_str(CONFIG).unwrap();
        let keys: Vec<_> = config
            .palette("warm")
            .unwrap()
            .colors
            .iter()
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(keys, vec!["yellow", "red", "orange"]);
        let names: Vec<_> = config.palettes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["warm", "mono"]);
    }

    #[test]
    fn test_attribute_label() {
        let config = Config::from_str(CONFIG).unwrap();
        assert_eq!(config.attribute("bg").unwrap().label("white").unwrap(), "white_bg");
        assert!(config.attribute("missing").is_none());
    }

    #[test]
    fn test_output_overrides() {
        let toml_str = format!(
            "{}\n[output]\nwidth = 640\nheight = 480\nmutation = \"cumulative\"\n",
            CONFIG
        );
        let config = Config::from_str(&toml_str).unwrap();
        assert_eq!(config.output.width, 640);
        assert_eq!(config.output.height, 480);
        assert_eq!(config.output.columns, 3);
        assert_eq!(config.output.mutation, MutationMode::Cumulative);
    }

    #[test]
    fn test_unknown_palette_reference() {
        let toml_str = CONFIG.replace("palette = \"mono\"", "palette = \"neon\"");
        let err = Config::from_str(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPalette { ref palette, .. } if palette == "neon"));
    }

    #[test]
    fn test_unknown_attribute_reference() {
        let toml_str = CONFIG.replace("id = \"bg\"", "id = \"border\"");
        let err = Config::from_str(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAttribute { ref id, .. } if id == "border"));
    }

    #[test]
    fn test_style_without_attributes() {
        let toml_str = format!("{}\n[[style]]\nname = \"Empty\"\nattribute = []\n", CONFIG);
        let err = Config::from_str(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyStyle { .. }));
    }

    #[test]
    fn test_bad_name_template() {
        let toml_str = CONFIG.replace("{color_key}_bg", "{color_value}_bg");
        let err = Config::from_str(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Template { field: "name", .. }));
    }

    #[test]
    fn test_bad_path_expression() {
        let toml_str = CONFIG.replace(".//{{{namespace}}}path", ".//{{{namespace}}}path[");
        let err = Config::from_str(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Path { .. }));
    }

    #[test]
    fn test_non_string_color() {
        let toml_str = CONFIG.replace("black = \"#000000\"", "black = 0");
        let err = Config::from_str(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let err = Config::from_str("namespace = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_invalid_toml_error() {
        let invalid = "this is not valid toml {{{{";
        assert!(Config::from_str(invalid).is_err());
    }
}
