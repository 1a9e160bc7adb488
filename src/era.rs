//! The era catalog: every style a portrait can be restaged in.
//!
//! The catalog is fixed at compile time and ordered the way the selector
//! shows it: historical eras first, then cinematic looks, then artistic
//! media. A sixteenth entry, [`custom`], is a sentinel whose prompt is
//! written by the user at selection time.
//!
//! ```text
//! Time Travel      ancient-egypt  vikings  roaring-20s  french-court  samurai  wild-west
//! Silver Screen    cyberpunk  film-noir  wes-anderson  80s-arcade  astronaut
//! Fine Art         oil-painting  pop-art  sketch  statue
//! Special Request  custom
//! ```
//!
//! Historical and cinematic prompts end with a shared instruction that keeps
//! the subject's face recognizable. Artistic prompts do not carry it, since
//! a charcoal sketch or a marble statue is not supposed to look
//! photorealistic.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Grouping shown as tabs in the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EraCategory {
    Historical,
    Cinematic,
    Artistic,
    /// Sentinel category: its only member takes a free-text prompt.
    Custom,
}

impl EraCategory {
    /// All categories in tab order.
    pub const ALL: [EraCategory; 4] = [
        EraCategory::Historical,
        EraCategory::Cinematic,
        EraCategory::Artistic,
        EraCategory::Custom,
    ];

    /// Tab label.
    pub fn label(self) -> &'static str {
        match self {
            EraCategory::Historical => "Time Travel",
            EraCategory::Cinematic => "Silver Screen",
            EraCategory::Artistic => "Fine Art",
            EraCategory::Custom => "Special Request",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EraCategory::Historical => "historical",
            EraCategory::Cinematic => "cinematic",
            EraCategory::Artistic => "artistic",
            EraCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for EraCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EraCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EraCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown category '{s}' (expected historical, cinematic, artistic or custom)")
            })
    }
}

/// A named style template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Era {
    /// Stable identifier, also used in export file names.
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Prompt sent to the generator. Empty for the custom sentinel.
    pub prompt: &'static str,
    pub icon: &'static str,
    /// Card gradient token (`from-X to-Y`).
    pub color: &'static str,
    pub category: EraCategory,
}

impl Era {
    pub fn is_custom(&self) -> bool {
        self.category == EraCategory::Custom
    }
}

/// Appends the shared likeness instruction to a prompt literal.
macro_rules! with_likeness {
    ($prompt:literal) => {
        concat!(
            $prompt,
            " Ensure the facial features and expression remain recognizable but blend them \
             perfectly into the target style. High resolution, photorealistic or \
             style-appropriate output."
        )
    };
}

const CATALOG: [Era; 15] = [
    // Historical
    Era {
        id: "ancient-egypt",
        title: "Ancient Egypt",
        description: "Pharaohs & Gold",
        prompt: with_likeness!(
            "Transform the person into an ancient Egyptian royalty with traditional gold jewelry, headdress, and linen robes. Background: The Great Sphinx and Pyramids under a golden sun."
        ),
        icon: "👑",
        color: "from-yellow-500 to-amber-700",
        category: EraCategory::Historical,
    },
    Era {
        id: "vikings",
        title: "Viking Age",
        description: "Warriors of the North",
        prompt: with_likeness!(
            "Transform the person into a fierce Viking warrior with fur armor and leather gear. Background: A foggy fjord with longships. Dramatic, moody lighting."
        ),
        icon: "⚔️",
        color: "from-slate-500 to-slate-800",
        category: EraCategory::Historical,
    },
    Era {
        id: "roaring-20s",
        title: "Roaring 20s",
        description: "Jazz & Gatsby",
        prompt: with_likeness!(
            "Transform the person into a 1920s jazz age character. Wearing a flapper dress or a sharp tuxedo with art deco styling. Background: A lavish 1920s ballroom party. Black and white photography style."
        ),
        icon: "🎷",
        color: "from-emerald-500 to-teal-900",
        category: EraCategory::Historical,
    },
    Era {
        id: "french-court",
        title: "French Aristocracy",
        description: "Marie Antoinette Era",
        prompt: with_likeness!(
            "Transform the person into an 18th-century French aristocrat. Powdered wig, elaborate pastel silk gown or frock coat, heavy makeup. Background: The Hall of Mirrors in Versailles. Rococo style."
        ),
        icon: "🍰",
        color: "from-pink-300 to-rose-400",
        category: EraCategory::Historical,
    },
    Era {
        id: "samurai",
        title: "Feudal Japan",
        description: "Way of the Warrior",
        prompt: with_likeness!(
            "Transform the person into a Samurai warrior with traditional armor (O-yoroi). Background: Cherry blossoms falling in a Japanese temple garden. Serene yet powerful."
        ),
        icon: "👺",
        color: "from-red-500 to-rose-900",
        category: EraCategory::Historical,
    },
    Era {
        id: "wild-west",
        title: "Wild West",
        description: "Gunslingers",
        prompt: with_likeness!(
            "Transform the person into a rugged cowboy or cowgirl with a hat, bandana, and leather vest. Background: A dusty saloon town at high noon. Western movie aesthetic, sepia tint."
        ),
        icon: "🤠",
        color: "from-orange-500 to-red-800",
        category: EraCategory::Historical,
    },
    // Cinematic
    Era {
        id: "cyberpunk",
        title: "Cyberpunk 2099",
        description: "Neon Future",
        prompt: with_likeness!(
            "Transform the person into a futuristic cyberpunk character with glowing neon techwear and cybernetic enhancements. Background: A rainy, neon-lit futuristic city street at night. Vibrant blue and pink lighting."
        ),
        icon: "🤖",
        color: "from-fuchsia-500 to-purple-900",
        category: EraCategory::Cinematic,
    },
    Era {
        id: "film-noir",
        title: "Film Noir",
        description: "The Detective",
        prompt: with_likeness!(
            "Transform the person into a 1940s detective or femme fatale. Trench coat, fedora, smoking cigarette. Background: Rainy city street at night with high contrast shadows. Black and white, dramatic lighting."
        ),
        icon: "🕵️",
        color: "from-gray-700 to-black",
        category: EraCategory::Cinematic,
    },
    Era {
        id: "wes-anderson",
        title: "Symmetrical",
        description: "Pastel Indie Movie",
        prompt: with_likeness!(
            "Transform the person into a character from a Wes Anderson movie. Quirky vintage outfit, beanie or beret, very symmetrical composition. Background: A pastel colored hotel or train car. Flat lighting, pastel color palette."
        ),
        icon: "🏨",
        color: "from-pink-200 to-yellow-200",
        category: EraCategory::Cinematic,
    },
    Era {
        id: "80s-arcade",
        title: "Retro Arcade",
        description: "Synthwave Glow",
        prompt: with_likeness!(
            "Transform the person into a cool 1980s character. Denim jacket, aviators, big hair. Background: An arcade with glowing cabinets or a grid landscape. Synthwave aesthetic, VHS grain effect."
        ),
        icon: "🕹️",
        color: "from-purple-500 to-indigo-500",
        category: EraCategory::Cinematic,
    },
    Era {
        id: "astronaut",
        title: "Space Odyssey",
        description: "Sci-Fi Epic",
        prompt: with_likeness!(
            "Transform the person into a cinematic sci-fi astronaut. High-tech sleek spacesuit. Background: Inside a futuristic spaceship looking out at a nebula. Kubrick style symmetry and lighting."
        ),
        icon: "🚀",
        color: "from-blue-500 to-indigo-900",
        category: EraCategory::Cinematic,
    },
    // Artistic
    Era {
        id: "oil-painting",
        title: "Oil Portrait",
        description: "Classical Masterpiece",
        prompt: "Transform the image into a classical oil painting style (Rembrandt or Da Vinci). Heavy brushstrokes, dramatic lighting (chiaroscuro), rich textures. The person should look like a painted portrait.",
        icon: "🎨",
        color: "from-amber-600 to-yellow-800",
        category: EraCategory::Artistic,
    },
    Era {
        id: "pop-art",
        title: "Pop Art",
        description: "Warhol Style",
        prompt: "Transform the image into a Pop Art style screen print. Bold solid colors, halftone dots, high contrast. Andy Warhol aesthetic.",
        icon: "🥫",
        color: "from-yellow-400 to-pink-500",
        category: EraCategory::Artistic,
    },
    Era {
        id: "sketch",
        title: "Charcoal Sketch",
        description: "Hand Drawn",
        prompt: "Transform the image into a charcoal sketch on textured paper. Black and white, rough lines, shading.",
        icon: "✏️",
        color: "from-gray-400 to-gray-600",
        category: EraCategory::Artistic,
    },
    Era {
        id: "statue",
        title: "Marble Statue",
        description: "Greek God",
        prompt: "Transform the person into a classic Greek marble statue. White stone texture, draped fabric. Background: A museum pedestal or ancient temple.",
        icon: "🏛️",
        color: "from-stone-100 to-stone-300",
        category: EraCategory::Artistic,
    },
];

const CUSTOM: Era = Era {
    id: "custom",
    title: "Special Commission",
    description: "Your Imagination",
    prompt: "",
    icon: "✨",
    color: "from-amber-500 to-amber-700",
    category: EraCategory::Custom,
};

/// Every fixed era in display order. Does not include the custom sentinel.
pub fn all() -> &'static [Era] {
    &CATALOG
}

/// The custom sentinel era.
pub fn custom() -> &'static Era {
    &CUSTOM
}

/// Eras in one category, in display order.
///
/// `Custom` yields the sentinel alone.
pub fn by_category(category: EraCategory) -> Vec<&'static Era> {
    match category {
        EraCategory::Custom => vec![custom()],
        _ => CATALOG.iter().filter(|e| e.category == category).collect(),
    }
}

/// Look up an era by id, including the custom sentinel.
pub fn find(id: &str) -> Option<&'static Era> {
    CATALOG
        .iter()
        .chain(std::iter::once(&CUSTOM))
        .find(|e| e.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let mut seen = HashSet::new();
        for era in all().iter().chain(std::iter::once(custom())) {
            assert!(seen.insert(era.id), "duplicate era id {}", era.id);
        }
    }

    #[test]
    fn category_counts() {
        assert_eq!(by_category(EraCategory::Historical).len(), 6);
        assert_eq!(by_category(EraCategory::Cinematic).len(), 5);
        assert_eq!(by_category(EraCategory::Artistic).len(), 4);
        assert_eq!(by_category(EraCategory::Custom).len(), 1);
    }

    #[test]
    fn by_category_preserves_display_order() {
        let ids: Vec<&str> = by_category(EraCategory::Artistic)
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, ["oil-painting", "pop-art", "sketch", "statue"]);
    }

    #[test]
    fn custom_sentinel_has_empty_prompt() {
        let era = custom();
        assert!(era.is_custom());
        assert!(era.prompt.is_empty());
        assert_eq!(by_category(EraCategory::Custom)[0].id, "custom");
    }

    #[test]
    fn fixed_eras_have_prompts() {
        for era in all() {
            assert!(!era.prompt.is_empty(), "{} has no prompt", era.id);
            assert!(!era.is_custom());
        }
    }

    #[test]
    fn likeness_instruction_on_historical_and_cinematic_only() {
        for era in all() {
            let has = era.prompt.contains("remain recognizable");
            match era.category {
                EraCategory::Historical | EraCategory::Cinematic => {
                    assert!(has, "{} missing likeness instruction", era.id)
                }
                _ => assert!(!has, "{} should not carry likeness instruction", era.id),
            }
        }
    }

    #[test]
    fn likeness_instruction_joined_with_single_space() {
        let vikings = find("vikings").unwrap();
        assert!(vikings.prompt.contains("moody lighting. Ensure the facial"));
        assert!(!vikings.prompt.contains("  "));
    }

    #[test]
    fn find_includes_custom() {
        assert_eq!(find("custom").map(|e| e.title), Some("Special Commission"));
        assert_eq!(find("vikings").map(|e| e.title), Some("Viking Age"));
        assert!(find("atlantis").is_none());
    }

    #[test]
    fn category_from_str() {
        assert_eq!("Cinematic".parse::<EraCategory>(), Ok(EraCategory::Cinematic));
        assert!("opera".parse::<EraCategory>().is_err());
    }

    #[test]
    fn category_labels() {
        let labels: Vec<&str> = EraCategory::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            ["Time Travel", "Silver Screen", "Fine Art", "Special Request"]
        );
    }
}
