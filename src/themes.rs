use crate::recovery::{recover_json, ExpectedShape};
use crate::schema::Theme;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The raw model reply for a theme request together with what could be parsed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeProposal {
    pub raw: String,
    pub themes: Vec<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ThemeProposal {
    pub fn from_response(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let themes = parse_themes(&raw);
        let error = themes
            .is_empty()
            .then(|| "No themes could be parsed from the model output".to_string());
        Self { raw, themes, error }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            raw: String::new(),
            themes: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// 1-based selection; `None` for an index outside the proposal.
    pub fn select(&self, index: usize) -> Option<Theme> {
        if index < 1 || index > self.themes.len() {
            return None;
        }
        self.themes.get(index - 1).cloned()
    }
}

fn theme_list(text: &str) -> Option<Vec<Value>> {
    let recovery = recover_json(text, ExpectedShape::Array);
    if let Some(error) = &recovery.error {
        debug!("Theme text could not be recovered: {}", error);
        return None;
    }

    match recovery.value {
        Value::Array(items) => Some(items),
        // A single theme object is treated as a one-element list.
        obj @ Value::Object(_) => Some(vec![obj]),
        _ => None,
    }
}

/// All themes that can be read from a model reply, in order.
pub fn parse_themes(text: &str) -> Vec<Theme> {
    theme_list(text)
        .unwrap_or_default()
        .iter()
        .filter_map(Theme::from_value)
        .collect()
}

/// Picks the theme at a 1-based `index` from raw model text.
///
/// Returns `None` for an index below 1 or past the end, for text with no
/// recoverable list, and when the selected element is not a theme object.
pub fn select_theme(text: &str, index: usize) -> Option<Theme> {
    let items = theme_list(text)?;

    if index < 1 || index > items.len() {
        warn!(
            "Invalid theme number {}. Please select a theme between 1 and {}",
            index,
            items.len()
        );
        return None;
    }

    let theme = Theme::from_value(&items[index - 1]);
    if theme.is_none() {
        warn!("Theme #{} is not a usable theme object", index);
    }
    theme
}

/// Like [`select_theme`] but never empty-handed: failures yield [`Theme::placeholder`].
pub fn select_theme_or_placeholder(text: &str, index: usize) -> Theme {
    select_theme(text, index).unwrap_or_else(Theme::placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FENCED: &str = r#"Here are three themes for your birthday:

```json
[
  {"Name": "Retro Arcade", "Description": "80s games night", "Aesthetic/Visual Style": "Neon pink and blue"},
  {"Name": "Garden Picnic", "Description": "Outdoor brunch", "Aesthetic/Visual Style": "Pastels and florals"},
  {"Name": "Hollywood Glam", "Description": "Red carpet evening", "Aesthetic/Visual Style": "Black, gold and red"}
]
```
"#;

    #[test]
    fn test_select_each_theme_from_fenced_block() {
        let names: Vec<String> = (1..=3)
            .map(|i| select_theme(FENCED, i).unwrap().name)
            .collect();
        assert_eq!(names, vec!["Retro Arcade", "Garden Picnic", "Hollywood Glam"]);

        let second = select_theme(FENCED, 2).unwrap();
        assert_eq!(second.description, "Outdoor brunch");
        assert_eq!(second.aesthetic, "Pastels and florals");
    }

    #[test]
    fn test_out_of_range_index_is_sentinel() {
        assert!(select_theme(FENCED, 0).is_none());
        assert!(select_theme(FENCED, 4).is_none());
    }

    #[test]
    fn test_single_element_list() {
        assert!(select_theme(r#"["only one element"]"#, 2).is_none());
        // The element exists but is not a theme.
        assert!(select_theme(r#"["only one element"]"#, 1).is_none());
    }

    #[test]
    fn test_python_repr_of_theme_list() {
        let text = "[{'Name': 'Boho Chic', 'Description': 'Relaxed', 'Aesthetic/Visual Style': 'Macrame'}]";
        assert_eq!(select_theme(text, 1).unwrap().name, "Boho Chic");
    }

    #[test]
    fn test_placeholder_substitution() {
        let theme = select_theme_or_placeholder("no themes today", 1);
        assert!(theme.is_placeholder());
    }

    #[test]
    fn test_proposal_parses_and_selects() {
        let proposal = ThemeProposal::from_response(FENCED);
        assert_eq!(proposal.themes.len(), 3);
        assert!(proposal.error.is_none());
        assert_eq!(proposal.select(3).unwrap().name, "Hollywood Glam");
        assert!(proposal.select(0).is_none());

        let empty = ThemeProposal::from_response("sorry");
        assert!(empty.themes.is_empty());
        assert!(empty.error.is_some());
    }
}
