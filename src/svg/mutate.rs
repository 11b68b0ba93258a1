//! Applying palette colors to template elements

use thiserror::Error;
use tracing::debug;

use crate::config::AttributeSpec;
use crate::format::{format, FormatError};

use super::path::{ElementPath, PathError};
use super::tree::Element;

#[derive(Debug, Error)]
pub enum MutateError {
    #[error("invalid path template '{template}': {source}")]
    PathTemplate {
        template: String,
        source: FormatError,
    },

    #[error("invalid path '{expression}': {source}")]
    Path {
        expression: String,
        source: PathError,
    },

    #[error("invalid style template '{template}': {source}")]
    StyleTemplate {
        template: String,
        source: FormatError,
    },
}

/// Overwrite the `style` attribute of every element matched by the
/// descriptor's path, with `color_value` substituted into its style template.
///
/// Returns the number of elements changed. A path that matches nothing
/// leaves the tree untouched.
///
/// # Example
///
/// ```rust
/// use svg_colorways::config::AttributeSpec;
/// use svg_colorways::svg::{apply_color, Document};
///
/// let mut doc = Document::parse(r#"<svg xmlns="urn:svg"><rect id="bg"/></svg>"#).unwrap();
/// let spec = AttributeSpec {
///     name: "{color_key}".to_string(),
///     xpath: ".//{{{namespace}}}rect[@id='bg']".to_string(),
///     style: "fill:{color_value}".to_string(),
/// };
/// let changed = apply_color(&mut doc.root, "urn:svg", &spec, "#ff0000").unwrap();
/// assert_eq!(changed, 1);
/// assert!(doc.to_xml().contains(r##"style="fill:#ff0000""##));
/// ```
pub fn apply_color(
    root: &mut Element,
    namespace: &str,
    attribute: &AttributeSpec,
    color_value: &str,
) -> Result<usize, MutateError> {
    let expression = format(&attribute.xpath, &[("namespace", namespace)]).map_err(|source| {
        MutateError::PathTemplate {
            template: attribute.xpath.clone(),
            source,
        }
    })?;
    let path = ElementPath::parse(&expression)
        .map_err(|source| MutateError::Path { expression, source })?;
    let style = format(&attribute.style, &[("color_value", color_value)]).map_err(|source| {
        MutateError::StyleTemplate {
            template: attribute.style.clone(),
            source,
        }
    })?;

    Ok(set_style(root, &path, &style))
}

/// Set `style` on every element selected by `path`
pub fn set_style(root: &mut Element, path: &ElementPath, style: &str) -> usize {
    let routes = path.select(root);
    if routes.is_empty() {
        debug!(path = path.as_str(), "path matched no elements");
    }
    for route in &routes {
        if let Some(element) = root.element_at_mut(route) {
            element.set_attribute("style", style);
        }
    }
    routes.len()
}
