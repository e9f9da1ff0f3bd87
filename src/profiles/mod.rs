use crate::models::AspectRatio;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatioProfile {
    pub ratio: AspectRatio,
    pub width: u32,
    pub height: u32,
    pub platform: &'static str,
    pub reference_filename: &'static str,
}

const PROFILES: [AspectRatioProfile; 5] = [
    AspectRatioProfile {
        ratio: AspectRatio::Square,
        width: 1024,
        height: 1024,
        platform: "Instagram Post",
        reference_filename: "blank_1x1.png",
    },
    AspectRatioProfile {
        ratio: AspectRatio::Landscape,
        width: 1344,
        height: 768,
        platform: "YouTube Thumbnail",
        reference_filename: "blank_16x9.png",
    },
    AspectRatioProfile {
        ratio: AspectRatio::Portrait,
        width: 768,
        height: 1344,
        platform: "YouTube Shorts / TikTok",
        reference_filename: "blank_9x16.png",
    },
    AspectRatioProfile {
        ratio: AspectRatio::Classic,
        width: 1184,
        height: 864,
        platform: "Classic Thumbnail",
        reference_filename: "blank_4x3.png",
    },
    AspectRatioProfile {
        ratio: AspectRatio::ClassicPortrait,
        width: 864,
        height: 1184,
        platform: "Pinterest Pin",
        reference_filename: "blank_3x4.png",
    },
];

pub fn profile_for(ratio: AspectRatio) -> &'static AspectRatioProfile {
    // Every AspectRatio variant has exactly one row in PROFILES.
    match ratio {
        AspectRatio::Square => &PROFILES[0],
        AspectRatio::Landscape => &PROFILES[1],
        AspectRatio::Portrait => &PROFILES[2],
        AspectRatio::Classic => &PROFILES[3],
        AspectRatio::ClassicPortrait => &PROFILES[4],
    }
}

pub fn all_profiles() -> &'static [AspectRatioProfile] {
    &PROFILES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ratio_resolves_to_its_own_profile() {
        for ratio in AspectRatio::ALL {
            assert_eq!(profile_for(ratio).ratio, ratio);
        }
    }

    #[test]
    fn profile_dimensions_match_their_ratio_orientation() {
        for profile in all_profiles() {
            let (w, h) = match profile.ratio {
                AspectRatio::Square => (1, 1),
                AspectRatio::Landscape => (16, 9),
                AspectRatio::Portrait => (9, 16),
                AspectRatio::Classic => (4, 3),
                AspectRatio::ClassicPortrait => (3, 4),
            };
            let expected = w as f64 / h as f64;
            let actual = profile.width as f64 / profile.height as f64;
            assert!(
                (expected - actual).abs() < 0.05,
                "{} resolves to {}x{}",
                profile.ratio,
                profile.width,
                profile.height
            );
        }
    }

    #[test]
    fn reference_filenames_are_unique() {
        let mut names = all_profiles()
            .iter()
            .map(|profile| profile.reference_filename)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all_profiles().len());
    }
}
