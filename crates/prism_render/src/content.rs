//! Scene content and its static fallback
//!
//! A surface presents the same items either as a 3D scene or, when it cannot
//! render, as a list of cards. The fallback must not drop anything.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub title: String,
    pub summary: String,
}

impl SceneItem {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
        }
    }
}

/// What a surface visualizes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneContent {
    pub title: String,
    pub items: Vec<SceneItem>,
    /// Particle count for the ambient effect before the tier multiplier.
    pub base_particles: u32,
}

impl SceneContent {
    pub fn fallback_view(&self) -> FallbackView<'_> {
        FallbackView {
            title: &self.title,
            cards: self
                .items
                .iter()
                .map(|item| FallbackCard {
                    title: &item.title,
                    summary: &item.summary,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackCard<'a> {
    pub title: &'a str,
    pub summary: &'a str,
}

/// Card list standing in for the 3D scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackView<'a> {
    pub title: &'a str,
    pub cards: Vec<FallbackCard<'a>>,
}

impl FallbackView<'_> {
    /// Plain-text rendering, for hosts without a DOM.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        for card in &self.cards {
            let _ = writeln!(out, "- {}: {}", card.title, card.summary);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> SceneContent {
        SceneContent {
            title: "Services".to_string(),
            items: vec![
                SceneItem::new("Web", "Sites and storefronts"),
                SceneItem::new("Mobile", "iOS and Android apps"),
                SceneItem::new("Cloud", "Infrastructure and ops"),
            ],
            base_particles: 400,
        }
    }

    #[test]
    fn fallback_keeps_every_item_in_order() {
        let content = content();
        let view = content.fallback_view();
        assert_eq!(view.title, "Services");
        let titles: Vec<&str> = view.cards.iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["Web", "Mobile", "Cloud"]);
        assert_eq!(view.cards[1].summary, "iOS and Android apps");
    }

    #[test]
    fn text_rendering_lists_cards() {
        let content = content();
        let text = content.fallback_view().to_text();
        assert!(text.starts_with("Services\n"));
        assert!(text.contains("- Cloud: Infrastructure and ops"));
        assert_eq!(text.lines().count(), 4);
    }
}
