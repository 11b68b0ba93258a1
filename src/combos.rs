//! Enumerating the color combinations of each style

use crate::config::Config;

/// One attribute slot bound to one palette color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledAttribute {
    pub attribute_id: String,
    pub color_key: String,
    pub color_value: String,
}

/// One styled attribute per slot of a style, in slot order
pub type Combination = Vec<StyledAttribute>;

/// All combinations of one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCombinations {
    pub style: String,
    pub combinations: Vec<Combination>,
}

/// Cartesian product of `slots`, first slot outermost
///
/// ```rust
/// use svg_colorways::combos::cartesian_product;
///
/// let product = cartesian_product(&[vec![1, 2], vec![10, 20]]);
/// assert_eq!(product, vec![vec![1, 10], vec![1, 20], vec![2, 10], vec![2, 20]]);
/// ```
pub fn cartesian_product<T: Clone>(slots: &[Vec<T>]) -> Vec<Vec<T>> {
    slots.iter().fold(vec![Vec::new()], |prefixes, slot| {
        prefixes
            .iter()
            .flat_map(|prefix| {
                slot.iter().map(move |item| {
                    let mut combination = prefix.clone();
                    combination.push(item.clone());
                    combination
                })
            })
            .collect()
    })
}

/// Combinations of every style in the configuration, in declaration order
///
/// Slots referring to an unknown palette contribute no colors, so the style
/// yields no combinations; [`Config::validate`] rejects such configurations.
pub fn enumerate(config: &Config) -> Vec<StyleCombinations> {
    config
        .styles
        .iter()
        .map(|style| {
            let slots: Vec<Vec<StyledAttribute>> = style
                .attributes
                .iter()
                .map(|slot| {
                    config
                        .palette(&slot.palette)
                        .map(|palette| {
                            palette
                                .colors
                                .iter()
                                .map(|color| StyledAttribute {
                                    attribute_id: slot.id.clone(),
                                    color_key: color.key.clone(),
                                    color_value: color.value.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect();

            StyleCombinations {
                style: style.name.clone(),
                combinations: cartesian_product(&slots),
            }
        })
        .collect()
}
