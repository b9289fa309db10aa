//! Turns user selections into the exact text sent to the provider.
//!
//! Everything here is pure: identical inputs always produce identical text.

use mockup_contracts::{FrameStyle, GenerationRequest, LightingStyle, Vibe, WallTexture};

const QUALITY_PREAMBLE: &str = "A photorealistic interior photograph shot on medium-format \
film: natural grain, true-to-life color, accurate perspective and gentle depth of field. \
It must look like a real photo of a real artwork in a real space, never a digital render.";

const PHYSICAL_INTERACTION: &str = "Physical interaction: the artwork belongs to the scene, not \
on top of it. Nearby objects and architecture cast soft, physically plausible shadows across \
its surface, and the room's light leaves a faint sheen that follows the light sources.";

const COLOR_GRADING: &str = "Color grading: match the artwork's white balance and color \
temperature to the ambient light of the room so it reads as photographed in place, not \
pasted in.";

const ANALYSIS_INSTRUCTION: &str = "Study the uploaded artwork: its palette, subject, scale \
and mood. Suggest real-world settings where it would be photographed hanging on a wall for \
a product mockup.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionMode {
    Bulk,
    Regenerate,
}

pub fn compose_generation_prompt(request: &GenerationRequest) -> String {
    let mut sections = vec![
        QUALITY_PREAMBLE.to_string(),
        format!("Scene: {}", request.scene_prompt),
        environment_clause(request.lighting, request.texture),
        placement_clause(request),
        PHYSICAL_INTERACTION.to_string(),
        COLOR_GRADING.to_string(),
    ];
    let negative = request.negative_prompt.trim();
    if !negative.is_empty() {
        sections.push(format!(
            "Do not include any of the following: {negative}."
        ));
    }
    sections.join("\n\n")
}

pub fn compose_analysis_prompt(vibe: Vibe, count: usize, mode: SuggestionMode) -> String {
    let count = count.max(1);
    let mut sections = vec![
        ANALYSIS_INSTRUCTION.to_string(),
        format!("Thematic focus: {}", vibe_focus(vibe)),
    ];
    if mode == SuggestionMode::Regenerate {
        sections.push(
            "Avoid the obvious first ideas: propose a fresh, less expected setting that still \
suits the artwork."
                .to_string(),
        );
    }
    let noun = if count == 1 { "string" } else { "strings" };
    sections.push(format!(
        "Respond with a strict JSON array of exactly {count} short scene-description {noun}, \
each under 25 words. No keys, no commentary, no markdown."
    ));
    sections.join("\n\n")
}

fn environment_clause(lighting: LightingStyle, texture: WallTexture) -> String {
    let light = match lighting {
        LightingStyle::Auto => {
            "Infer the lighting a photographer would find on location in this scene.".to_string()
        }
        named => format!("Lighting: {}, {}.", named.label(), lighting_detail(named)),
    };
    let wall = match texture {
        WallTexture::Auto => {
            "Infer a wall surface that fits the architecture of the scene.".to_string()
        }
        named => format!("Wall surface: {}, {}.", named.label(), texture_detail(named)),
    };
    format!("Environment: {light} {wall}")
}

fn placement_clause(request: &GenerationRequest) -> String {
    let size = format!(
        "{} print ({})",
        request.print_size.label(),
        request.print_size.dimensions()
    );
    match request.frame {
        FrameStyle::None => format!(
            "Placement: the artwork is an unmounted poster, a {size}, fixed flat to the wall \
with no border or mat; paper edges and a slight curl are visible at the corners."
        ),
        FrameStyle::Auto => format!(
            "Placement: the artwork is professionally framed as a {size}, in a frame style \
chosen to suit the surrounding interior, hung at a natural viewing height."
        ),
        named => format!(
            "Placement: the artwork is framed in a {} frame ({}) as a {size}, hung at a \
natural viewing height.",
            named.label(),
            frame_detail(named)
        ),
    }
}

fn lighting_detail(lighting: LightingStyle) -> &'static str {
    match lighting {
        LightingStyle::Auto => "",
        LightingStyle::NaturalDaylight => "soft even daylight from nearby windows",
        LightingStyle::GoldenHour => "low warm sun raking across the room",
        LightingStyle::SoftStudio => "diffused studio softboxes with minimal contrast",
        LightingStyle::MoodyEvening => "dim warm lamps with deep falloff into shadow",
        LightingStyle::GallerySpotlight => "a focused ceiling spotlight pooling on the artwork",
    }
}

fn texture_detail(texture: WallTexture) -> &'static str {
    match texture {
        WallTexture::Auto => "",
        WallTexture::SmoothPlaster => "matte and seamless",
        WallTexture::ExposedBrick => "weathered red brick with uneven mortar",
        WallTexture::RawConcrete => "board-formed concrete with visible pores",
        WallTexture::WoodPaneling => "vertical timber boards with natural grain",
        WallTexture::TexturedLinen => "a woven fabric wallcovering",
    }
}

fn frame_detail(frame: FrameStyle) -> &'static str {
    match frame {
        FrameStyle::Auto | FrameStyle::None => "",
        FrameStyle::ThinBlackMetal => "slim matte black aluminium profile, museum glass",
        FrameStyle::NaturalOak => "light oak moulding with a white passe-partout",
        FrameStyle::GalleryWhite => "painted white wood with a deep mat",
        FrameStyle::AntiqueGold => "ornate gilded moulding with a patinated finish",
        FrameStyle::FloatingCanvas => "canvas floating inside a narrow dark tray",
    }
}

fn vibe_focus(vibe: Vibe) -> &'static str {
    match vibe {
        Vibe::SurpriseMe => "anything goes. Mix residential, commercial and hospitality \
spaces, eras and climates; keep every idea distinct from the others.",
        Vibe::ModernMinimal => "modern, minimal, Scandinavian, clean lines, negative space, \
neutral palette, designer furniture.",
        Vibe::IndustrialRaw => "industrial, raw, loft, warehouse, exposed brick, concrete, \
steel beams, large factory windows.",
        Vibe::CozyWarm => "cozy, warm, lived-in, reading nook, soft textiles, wood, candles, \
bookshelves, hygge.",
        Vibe::LuxuryClassic => "luxury, classic, boutique hotel, marble, velvet, brass, \
crown moulding, high ceilings.",
        Vibe::NatureOrganic => "nature, organic, biophilic, plants, rattan, linen, stone, \
sunlit greenhouse, earthy tones.",
    }
}
