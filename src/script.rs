/// Text content and asset ids for one run of the intro sequence.
///
/// Everything the sequence shows or plays is data here; the timing and the
/// warp are not tunable. Deserializable so hosts can ship the script alongside
/// their other assets.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SequenceScript {
    /// Centered fading lines shown first.
    pub opening_lines: Vec<String>,
    /// Title lines zoomed in after the opening.
    pub title_lines: Vec<String>,
    /// Prologue lines scrolled into the distance.
    pub crawl_lines: Vec<String>,
    /// Asset id of the theme music track.
    pub theme_track: String,
    /// Screen id pushed to the host when the sequence ends.
    pub next_screen: String,
}

impl Default for SequenceScript {
    fn default() -> Self {
        Self {
            opening_lines: vec![
                "A long time ago, in a galaxy".to_string(),
                "far, far away...".to_string(),
            ],
            title_lines: vec!["HUNGER".to_string(), "SPACE".to_string()],
            crawl_lines: vec![
                "HONGER SPACE*".to_string(),
                "*So hungry that I can't even spell right.".to_string(),
                String::new(),
                "It is a period of civil war. Rebel spaceships have been captured,".to_string(),
                "and are forced to fight till to the death. Only two ships remain,".to_string(),
                "with no poisonous berries in sight to save their lives.".to_string(),
            ],
            theme_track: "music/theme.mp3".to_string(),
            next_screen: "menu".to_string(),
        }
    }
}
