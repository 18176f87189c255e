//! Binary chord templates
//!
//! Defines pitch-class profiles for 31 chords: 12 major triads, 12 minor triads, three
//! dominant sevenths (C7, F7, G7) and four minor sevenths (Dm7, Em7, Am7, Bm7).

/// Pitch-class names, sharps only
pub const PITCH_CLASS_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

const MAJOR: &[usize] = &[0, 4, 7];
const MINOR: &[usize] = &[0, 3, 7];
const DOMINANT_SEVENTH: &[usize] = &[0, 4, 7, 10];
const MINOR_SEVENTH: &[usize] = &[0, 3, 7, 10];

/// Roots with a dominant-seventh template
const DOMINANT_SEVENTH_ROOTS: [usize; 3] = [0, 5, 7];

/// Roots with a minor-seventh template
const MINOR_SEVENTH_ROOTS: [usize; 4] = [2, 4, 9, 11];

/// A named 12-bin chord profile
#[derive(Debug, Clone, PartialEq)]
pub struct ChordTemplate {
    /// Chord label, e.g. `"F#m"`
    pub name: String,

    /// 1.0 on chord tones, 0.0 elsewhere
    pub profile: [f32; 12],
}

impl ChordTemplate {
    fn build(root: usize, intervals: &[usize], suffix: &str) -> Self {
        let mut profile = [0.0f32; 12];
        for interval in intervals {
            profile[(root + interval) % 12] = 1.0;
        }
        Self {
            name: format!("{}{}", PITCH_CLASS_NAMES[root % 12], suffix),
            profile,
        }
    }
}

/// Chord templates in match-priority order
///
/// Triads come first so a plain triad wins ties against its seventh.
#[derive(Debug, Clone)]
pub struct ChordTemplates {
    templates: Vec<ChordTemplate>,
}

impl ChordTemplates {
    /// Create the 31 reference templates
    pub fn new() -> Self {
        let mut templates = Vec::with_capacity(31);
        templates.extend((0..12).map(|root| ChordTemplate::build(root, MAJOR, "")));
        templates.extend((0..12).map(|root| ChordTemplate::build(root, MINOR, "m")));
        templates.extend(
            DOMINANT_SEVENTH_ROOTS
                .iter()
                .map(|&root| ChordTemplate::build(root, DOMINANT_SEVENTH, "7")),
        );
        templates.extend(
            MINOR_SEVENTH_ROOTS
                .iter()
                .map(|&root| ChordTemplate::build(root, MINOR_SEVENTH, "m7")),
        );
        Self { templates }
    }

    /// All templates
    pub fn iter(&self) -> impl Iterator<Item = &ChordTemplate> {
        self.templates.iter()
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when there are no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for ChordTemplates {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(templates: &'a ChordTemplates, name: &str) -> &'a ChordTemplate {
        templates.iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_template_count_and_names() {
        let templates = ChordTemplates::new();
        assert_eq!(templates.len(), 31);
        let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names[0], "C");
        assert_eq!(names[13], "C#m");
        assert!(names.contains(&"G7"));
        assert!(names.contains(&"Bm7"));
        assert!(!names.contains(&"D7"));
    }

    #[test]
    fn test_template_profiles() {
        let templates = ChordTemplates::new();
        let am = find(&templates, "Am");
        let tones: Vec<usize> = (0..12).filter(|&i| am.profile[i] == 1.0).collect();
        assert_eq!(tones, vec![0, 4, 9], "A C E");

        let g7 = find(&templates, "G7");
        let tones: Vec<usize> = (0..12).filter(|&i| g7.profile[i] == 1.0).collect();
        assert_eq!(tones, vec![2, 5, 7, 11], "G B D F");
    }
}
