use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseStyleError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed option list whose label is both the prompt wording and
/// the persisted form. Parsing accepts the label or its kebab-case slug.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ParseStyleError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let wanted = slug(raw);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| {
                        candidate.label().eq_ignore_ascii_case(raw.trim())
                            || slug(candidate.label()) == wanted
                    })
                    .ok_or_else(|| ParseStyleError {
                        kind: $kind,
                        value: raw.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

labelled_enum! {
    FrameStyle ("frame style") {
        Auto => "Auto",
        None => "None",
        ThinBlackMetal => "Thin Black Metal",
        NaturalOak => "Natural Oak",
        GalleryWhite => "Gallery White",
        AntiqueGold => "Antique Gold",
        FloatingCanvas => "Floating Canvas",
    }
}

labelled_enum! {
    LightingStyle ("lighting style") {
        Auto => "Auto",
        NaturalDaylight => "Natural Daylight",
        GoldenHour => "Golden Hour",
        SoftStudio => "Soft Studio",
        MoodyEvening => "Moody Evening",
        GallerySpotlight => "Gallery Spotlight",
    }
}

labelled_enum! {
    WallTexture ("wall texture") {
        Auto => "Auto",
        SmoothPlaster => "Smooth Plaster",
        ExposedBrick => "Exposed Brick",
        RawConcrete => "Raw Concrete",
        WoodPaneling => "Wood Paneling",
        TexturedLinen => "Textured Linen",
    }
}

labelled_enum! {
    PrintSize ("print size") {
        Small => "Small",
        Medium => "Medium",
        Large => "Large",
        Oversized => "Oversized",
    }
}

labelled_enum! {
    AspectRatio ("aspect ratio") {
        Square => "1:1",
        Portrait => "3:4",
        Landscape => "4:3",
        Tall => "9:16",
        Wide => "16:9",
    }
}

labelled_enum! {
    ResolutionTier ("resolution tier") {
        Draft => "Draft",
        UpscaledHigh => "Upscaled High",
    }
}

labelled_enum! {
    /// Thematic bias for scene suggestions.
    Vibe ("vibe") {
        SurpriseMe => "Surprise Me",
        ModernMinimal => "Modern & Minimal",
        IndustrialRaw => "Industrial & Raw",
        CozyWarm => "Cozy & Warm",
        LuxuryClassic => "Luxury & Classic",
        NatureOrganic => "Nature & Organic",
    }
}

impl PrintSize {
    /// Physical dimensions as they are phrased in placement instructions.
    pub fn dimensions(self) -> &'static str {
        match self {
            PrintSize::Small => "30x40 cm",
            PrintSize::Medium => "50x70 cm",
            PrintSize::Large => "70x100 cm",
            PrintSize::Oversized => "100x150 cm",
        }
    }
}

impl AspectRatio {
    pub fn ratio(self) -> f64 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::Portrait => 3.0 / 4.0,
            AspectRatio::Landscape => 4.0 / 3.0,
            AspectRatio::Tall => 9.0 / 16.0,
            AspectRatio::Wide => 16.0 / 9.0,
        }
    }

    /// Closest supported ratio to the given natural dimensions.
    pub fn nearest(width: u32, height: u32) -> AspectRatio {
        if width == 0 || height == 0 {
            return AspectRatio::Square;
        }
        let target = f64::from(width) / f64::from(height);
        let mut best = AspectRatio::Square;
        let mut best_delta = f64::MAX;
        for candidate in Self::ALL.iter().copied() {
            let delta = (candidate.ratio() - target).abs();
            if delta < best_delta {
                best = candidate;
                best_delta = delta;
            }
        }
        best
    }

    /// Pixel dimensions whose longest edge is `longest`.
    pub fn dims(self, longest: u32) -> (u32, u32) {
        let ratio = self.ratio();
        if ratio >= 1.0 {
            (longest, ((f64::from(longest) / ratio).round() as u32).max(1))
        } else {
            (((f64::from(longest) * ratio).round() as u32).max(1), longest)
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Square
    }
}

impl Default for PrintSize {
    fn default() -> Self {
        PrintSize::Medium
    }
}

impl Default for ResolutionTier {
    fn default() -> Self {
        ResolutionTier::Draft
    }
}

impl Default for Vibe {
    fn default() -> Self {
        Vibe::SurpriseMe
    }
}

impl ResolutionTier {
    /// Image-size hint understood by the generation capability.
    pub fn image_size(self) -> &'static str {
        match self {
            ResolutionTier::Draft => "1K",
            ResolutionTier::UpscaledHigh => "4K",
        }
    }
}

fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_slugs() {
        assert_eq!("Industrial & Raw".parse::<Vibe>(), Ok(Vibe::IndustrialRaw));
        assert_eq!("industrial-raw".parse::<Vibe>(), Ok(Vibe::IndustrialRaw));
        assert_eq!("thin black metal".parse::<FrameStyle>(), Ok(FrameStyle::ThinBlackMetal));
        assert_eq!("16:9".parse::<AspectRatio>(), Ok(AspectRatio::Wide));
        assert_eq!("none".parse::<FrameStyle>(), Ok(FrameStyle::None));
    }

    #[test]
    fn unknown_value_names_kind_and_value() {
        let err = "velvet".parse::<WallTexture>().unwrap_err();
        assert_eq!(err.to_string(), "unknown wall texture 'velvet'");
    }

    #[test]
    fn serde_uses_labels() -> anyhow::Result<()> {
        let encoded = serde_json::to_string(&LightingStyle::GoldenHour)?;
        assert_eq!(encoded, "\"Golden Hour\"");
        let decoded: LightingStyle = serde_json::from_str(&encoded)?;
        assert_eq!(decoded, LightingStyle::GoldenHour);
        Ok(())
    }

    #[test]
    fn nearest_ratio_tracks_natural_dimensions() {
        assert_eq!(AspectRatio::nearest(1920, 1080), AspectRatio::Wide);
        assert_eq!(AspectRatio::nearest(900, 1200), AspectRatio::Portrait);
        assert_eq!(AspectRatio::nearest(1000, 1010), AspectRatio::Square);
        assert_eq!(AspectRatio::nearest(0, 500), AspectRatio::Square);
    }

    #[test]
    fn dims_keep_longest_edge() {
        assert_eq!(AspectRatio::Wide.dims(1024), (1024, 576));
        assert_eq!(AspectRatio::Portrait.dims(1024), (768, 1024));
        assert_eq!(AspectRatio::Square.dims(256), (256, 256));
    }
}
