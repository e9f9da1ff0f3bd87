use crate::{error::GenerationError, models::MAX_PROMPT_CHARS, profiles::AspectRatioProfile};

const DESIGN_PRINCIPLES: &str = "Design principles:\n\
- One clear focal point that reads at small sizes\n\
- Strong contrast between subject and background\n\
- Bold, saturated colors and clean composition\n\
- Leave breathing room near the edges so nothing important is cropped\n\
- Expressive faces or dynamic poses when people or characters appear\n\
- No watermarks, borders, or UI chrome";

pub fn validate_prompt(prompt: &str) -> Result<(), GenerationError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::validation("prompt is required"));
    }

    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(GenerationError::validation(format!(
            "prompt must be at most {MAX_PROMPT_CHARS} characters (got {length})"
        )));
    }

    Ok(())
}

/// Builds the single text part sent after the image parts.
///
/// The first image is always the blank reference. When `has_user_image` is
/// set, the second image is the user's and only its content and style count.
pub fn build_instruction(
    profile: &AspectRatioProfile,
    prompt: &str,
    has_user_image: bool,
) -> String {
    let width = profile.width;
    let height = profile.height;
    let ratio = profile.ratio;

    let mut text = format!(
        "You are an expert thumbnail designer.\n\
Output size: exactly {width}x{height} pixels ({ratio} aspect ratio). Width {width}px, height {height}px.\n\
The FIRST image is a blank {width}x{height} canvas. Its dimensions are authoritative: \
render the final thumbnail at exactly those dimensions and fill the whole canvas."
    );

    if has_user_image {
        text.push_str(
            "\nThe SECOND image is supplied by the user for content and style reference only. \
Ignore its dimensions and aspect ratio completely; do not copy its framing or canvas size.",
        );
    }

    text.push_str(&format!(
        "\n\nThumbnail request:\n{}\n\n{DESIGN_PRINCIPLES}\n\n\
Final reminder: the output must be {width}x{height} pixels.",
        prompt.trim()
    ));

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::AspectRatio, profiles::profile_for};

    #[test]
    fn rejects_blank_and_oversized_prompts() {
        assert!(validate_prompt("").is_err());
        assert!(validate_prompt("   \n").is_err());
        assert!(validate_prompt(&"a".repeat(MAX_PROMPT_CHARS + 1)).is_err());
        assert!(validate_prompt(&"a".repeat(MAX_PROMPT_CHARS)).is_ok());
    }

    #[test]
    fn prompt_length_counts_characters_not_bytes() {
        let prompt = "é".repeat(MAX_PROMPT_CHARS);
        assert!(prompt.len() > MAX_PROMPT_CHARS);
        assert!(validate_prompt(&prompt).is_ok());
    }

    #[test]
    fn instruction_states_dimensions_and_literal_prompt() {
        let profile = profile_for(AspectRatio::Landscape);
        let text = build_instruction(profile, "  a cat astronaut ", false);

        assert!(text.contains("1344x768"));
        assert!(text.contains("Width 1344px, height 768px"));
        assert!(text.contains("a cat astronaut"));
        assert!(text.contains("FIRST image"));
        assert!(!text.contains("SECOND image"));
        assert!(text.contains("Design principles"));
    }

    #[test]
    fn instruction_demotes_user_image_dimensions() {
        let profile = profile_for(AspectRatio::Square);
        let text = build_instruction(profile, "retro poster", true);
        assert!(text.contains("SECOND image"));
        assert!(text.contains("Ignore its dimensions"));
    }
}
