//! Chord label parsing and harmonic relations
//!
//! Labels are a root note (letter plus optional `#` or `b`) followed by a quality suffix:
//! `"C"`, `"F#m"`, `"Bbmaj7"`, `"G7"`. `"N"` marks frames without a chord.

/// No-chord sentinel
pub const NO_CHORD: &str = "N";

/// Root intervals (in semitones, mod 12) that make a short chord a passing chord
///
/// Everything except unison, minor third and tritone: semitone approaches and
/// circle-of-fifths motion dominate.
pub const TRANSITIONAL_INTERVALS: [u8; 9] = [1, 2, 4, 5, 7, 8, 9, 10, 11];

/// Relative major/minor pairs as (major root, minor root) pitch classes
///
/// C/Am, G/Em, D/Bm, A/F#m, E/C#m, B/G#m, F#/D#m, F/Dm
const RELATIVE_PAIRS: [(u8, u8); 8] = [
    (0, 9),
    (7, 4),
    (2, 11),
    (9, 6),
    (4, 1),
    (11, 8),
    (6, 3),
    (5, 2),
];

/// True for the no-chord sentinel
pub fn is_no_chord(label: &str) -> bool {
    label.trim() == NO_CHORD
}

fn letter_pitch_class(letter: char) -> Option<i32> {
    match letter {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Split a label into its root pitch class (0 = C) and quality suffix
///
/// Returns `None` for the no-chord sentinel and unparsable labels.
///
/// # Example
///
/// ```
/// use cadenza_dsp::features::chords::label::parse_root;
///
/// assert_eq!(parse_root("F#m7"), Some((6, "m7")));
/// assert_eq!(parse_root("Bb"), Some((10, "")));
/// assert_eq!(parse_root("N"), None);
/// ```
pub fn parse_root(label: &str) -> Option<(u8, &str)> {
    let label = label.trim();
    let mut chars = label.chars();
    let base = letter_pitch_class(chars.next()?)?;

    let (offset, rest) = match chars.next() {
        Some('#') | Some('♯') => (1, chars.as_str()),
        Some('b') | Some('♭') => (-1, chars.as_str()),
        _ => (0, &label[1..]),
    };

    Some(((base + offset).rem_euclid(12) as u8, rest))
}

/// Root pitch class of a label
pub fn root_pitch_class(label: &str) -> Option<u8> {
    parse_root(label).map(|(root, _)| root)
}

fn is_plain_major(suffix: &str) -> bool {
    matches!(suffix, "" | "maj" | "M")
}

fn is_plain_minor(suffix: &str) -> bool {
    matches!(suffix, "m" | "min" | "-")
}

/// True for relative major/minor triads from the fixed pair table
pub fn are_relatives(a: &str, b: &str) -> bool {
    let (Some((ra, sa)), Some((rb, sb))) = (parse_root(a), parse_root(b)) else {
        return false;
    };
    let pair = if is_plain_major(sa) && is_plain_minor(sb) {
        (ra, rb)
    } else if is_plain_minor(sa) && is_plain_major(sb) {
        (rb, ra)
    } else {
        return false;
    };
    RELATIVE_PAIRS.contains(&pair)
}

/// Harmonic similarity: identical labels, a shared root, or a relative major/minor pair
///
/// Labels without a parsable root are only similar to themselves.
pub fn harmonically_similar(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (root_pitch_class(a), root_pitch_class(b)) {
        (Some(ra), Some(rb)) if ra == rb => true,
        _ => are_relatives(a, b),
    }
}

/// Root interval from `chord` up to `neighbor`, in semitones mod 12
pub fn root_interval(chord: &str, neighbor: &str) -> Option<u8> {
    let from = root_pitch_class(chord)? as i32;
    let to = root_pitch_class(neighbor)? as i32;
    Some((to - from).rem_euclid(12) as u8)
}

/// True when a short `chord` next to `neighbor` is most likely a passing chord
pub fn is_transitional(chord: &str, neighbor: &str) -> bool {
    root_interval(chord, neighbor).map_or(false, |i| TRANSITIONAL_INTERVALS.contains(&i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root() {
        assert_eq!(parse_root("C"), Some((0, "")));
        assert_eq!(parse_root("C#"), Some((1, "")));
        assert_eq!(parse_root("Db"), Some((1, "")));
        assert_eq!(parse_root("Am7"), Some((9, "m7")));
        assert_eq!(parse_root("Cb"), Some((11, "")));
        assert_eq!(parse_root("Bbm"), Some((10, "m")));
        assert_eq!(parse_root(" G "), Some((7, "")));
        assert_eq!(parse_root("N"), None);
        assert_eq!(parse_root(""), None);
        assert_eq!(parse_root("x"), None);
    }

    #[test]
    fn test_similarity_uses_parsed_roots() {
        assert!(harmonically_similar("C", "C"));
        assert!(harmonically_similar("C", "C7"));
        assert!(harmonically_similar("C#m", "Db"));
        assert!(!harmonically_similar("C", "C#"), "different roots sharing a letter");
        assert!(!harmonically_similar("C", "G"));
        assert!(harmonically_similar("N", "N"));
        assert!(!harmonically_similar("N", "C"));
    }

    #[test]
    fn test_relatives() {
        assert!(are_relatives("C", "Am"));
        assert!(are_relatives("Am", "C"));
        assert!(are_relatives("F#", "D#m"));
        assert!(are_relatives("Gb", "Ebm"), "enharmonic spellings");
        assert!(!are_relatives("C", "Em"));
        assert!(!are_relatives("Am", "Cm"));
        assert!(!are_relatives("C7", "Am"), "only plain triads");
        // Not in the table
        assert!(!are_relatives("Bb", "Gm"));
        assert!(harmonically_similar("G", "Em"));
    }

    #[test]
    fn test_transitional_intervals() {
        assert!(is_transitional("G", "C"), "fourth up");
        assert!(is_transitional("B", "C"), "semitone approach");
        assert!(is_transitional("C", "G"), "fifth up");
        assert!(!is_transitional("C", "Cm"), "unison");
        assert!(!is_transitional("C", "Eb"), "minor third");
        assert!(!is_transitional("C", "F#"), "tritone");
        assert!(!is_transitional("N", "C"));
        assert_eq!(root_interval("A", "C"), Some(3));
    }
}
