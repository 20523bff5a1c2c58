use std::collections::BTreeSet;

use crate::foundation::error::{ReelError, ReelResult};
use crate::script::scene::Scene;

/// Header and transition tokens that the uppercase-run scan must not report
/// as character names.
const STOP_WORDS: &[&str] = &["INT", "EXT", "DAY", "NIGHT", "FADE", "CUT", "TO"];

/// Parse raw script text into an ordered scene list.
///
/// Scripts containing at least one screenplay header line (`INT.`/`EXT.`)
/// are parsed in formal mode; anything else is split into one scene per
/// blank-line-separated paragraph.
pub fn parse_script(text: &str) -> ReelResult<Vec<Scene>> {
    let scenes = if text.lines().any(is_scene_header) {
        parse_formal(text)
    } else {
        parse_simple(text)
    };

    if scenes.is_empty() {
        return Err(ReelError::EmptyScript);
    }
    tracing::info!(scenes = scenes.len(), "segmented script");
    Ok(scenes)
}

fn is_scene_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("INT.") || trimmed.starts_with("EXT.")
}

/// Formal screenplay mode: every header line opens a scene, the text up to
/// the next header is its dialogue. Text before the first header is ignored.
fn parse_formal(text: &str) -> Vec<Scene> {
    fn finish(scenes: &mut Vec<Scene>, (location, time_of_day, dialogue): (String, String, String)) {
        let number = scenes.len() as u32 + 1;
        scenes.push(make_scene(number, location, time_of_day, &dialogue));
    }

    let mut scenes = Vec::new();
    let mut open: Option<(String, String, String)> = None;

    for line in text.lines() {
        if is_scene_header(line) {
            if let Some(pending) = open.take() {
                finish(&mut scenes, pending);
            }
            let (location, time_of_day) = parse_header(line.trim());
            open = Some((location, time_of_day, String::new()));
        } else if let Some((_, _, dialogue)) = open.as_mut() {
            if !dialogue.is_empty() {
                dialogue.push('\n');
            }
            dialogue.push_str(line);
        }
    }
    if let Some(pending) = open.take() {
        finish(&mut scenes, pending);
    }
    scenes
}

/// Simple mode: each non-empty blank-line-separated paragraph becomes one
/// scene with a synthesized location.
fn parse_simple(text: &str) -> Vec<Scene> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, paragraph)| {
            let number = i as u32 + 1;
            make_scene(number, format!("Scene {number}"), "DAY".to_owned(), paragraph)
        })
        .collect()
}

fn make_scene(number: u32, location: String, time_of_day: String, dialogue: &str) -> Scene {
    let dialogue = dialogue.trim().to_owned();
    let characters = extract_characters(&dialogue);
    Scene {
        number,
        location,
        time_of_day,
        dialogue,
        characters,
    }
}

/// Split a header like `INT. COFFEE SHOP - DAY` into location and time.
///
/// A header without a `-` separator yields the whole stripped header as the
/// location with the default time `DAY`.
fn parse_header(header: &str) -> (String, String) {
    let mut parts = header.split('-');
    let location_part = parts.next().unwrap_or(header);
    let location = location_part
        .replace("INT.", "")
        .replace("EXT.", "")
        .trim()
        .to_owned();

    let time_of_day = match parts.next() {
        Some(time) => time.trim().to_owned(),
        None => "DAY".to_owned(),
    };
    (location, time_of_day)
}

/// Best-effort character-name extraction: maximal runs of ASCII uppercase
/// letters and spaces, bounded by word boundaries.
///
/// A run starts at an uppercase letter not preceded by an alphanumeric or
/// underscore, is trimmed back to its last uppercase letter, and must span at
/// least two characters. Matches equal to a stop word are discarded. The
/// heuristic over-matches shouted dialogue and acronyms and under-matches
/// mixed-case names; that is accepted.
fn extract_characters(text: &str) -> BTreeSet<String> {
    let bytes = text.as_bytes();
    let mut names = BTreeSet::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_uppercase() || preceded_by_word_byte(bytes, i) {
            i += 1;
            continue;
        }

        let mut end = i;
        let mut last_upper = i;
        while end < bytes.len() && (bytes[end].is_ascii_uppercase() || bytes[end] == b' ') {
            if bytes[end].is_ascii_uppercase() {
                last_upper = end;
            }
            end += 1;
        }

        let run = &text[i..=last_upper];
        if run.len() >= 2 && !STOP_WORDS.contains(&run) {
            names.insert(run.to_owned());
        }
        i = end;
    }
    names
}

fn preceded_by_word_byte(bytes: &[u8], i: usize) -> bool {
    i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SCENE_SCRIPT: &str =
        "INT. COFFEE SHOP - DAY\n\nSARAH sits.\n\nEXT. PARK - NIGHT\n\nThey walk.";

    #[test]
    fn formal_mode_numbers_scenes_contiguously() {
        let scenes = parse_script(TWO_SCENE_SCRIPT).unwrap();
        assert_eq!(scenes.len(), 2);

        assert_eq!(scenes[0].number, 1);
        assert_eq!(scenes[0].location, "COFFEE SHOP");
        assert_eq!(scenes[0].time_of_day, "DAY");
        assert!(scenes[0].characters.contains("SARAH"));

        assert_eq!(scenes[1].number, 2);
        assert_eq!(scenes[1].location, "PARK");
        assert_eq!(scenes[1].time_of_day, "NIGHT");
    }

    #[test]
    fn simple_mode_synthesizes_scene_locations() {
        let scenes = parse_script("First paragraph.\n\nSecond paragraph.\n\nThird.").unwrap();
        assert_eq!(scenes.len(), 3);
        for (i, scene) in scenes.iter().enumerate() {
            assert_eq!(scene.number, i as u32 + 1);
            assert_eq!(scene.location, format!("Scene {}", i + 1));
            assert_eq!(scene.time_of_day, "DAY");
        }
    }

    #[test]
    fn empty_script_is_an_error() {
        assert!(matches!(parse_script(""), Err(ReelError::EmptyScript)));
        assert!(matches!(parse_script("  \n\n  "), Err(ReelError::EmptyScript)));
    }

    #[test]
    fn header_without_separator_defaults_time() {
        let scenes = parse_script("INT. HALLWAY\n\nFootsteps echo.").unwrap();
        assert_eq!(scenes[0].location, "HALLWAY");
        assert_eq!(scenes[0].time_of_day, "DAY");
    }

    #[test]
    fn empty_dialogue_scene_preserves_numbering() {
        let scenes = parse_script("INT. A - DAY\nEXT. B - NIGHT\n\nSomething happens.").unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].number, 1);
        assert!(scenes[0].dialogue.is_empty());
        assert_eq!(scenes[1].number, 2);
        assert_eq!(scenes[1].dialogue, "Something happens.");
    }

    #[test]
    fn preamble_before_first_header_is_ignored() {
        let scenes = parse_script("A working title\n\nINT. LAB - NIGHT\n\nBEEP.").unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].location, "LAB");
    }

    #[test]
    fn stop_words_are_never_characters() {
        let scenes =
            parse_script("INT. LAB - NIGHT\n\nSARAH points. FADE.\n\nEXT. LAB - DAY\n\nNIGHT falls on MIGUEL.")
                .unwrap();
        for scene in &scenes {
            for stop in STOP_WORDS {
                assert!(!scene.characters.contains(*stop), "found stop word {stop}");
            }
        }
        assert!(scenes[0].characters.contains("SARAH"));
        assert!(scenes[1].characters.contains("MIGUEL"));
    }

    #[test]
    fn extraction_is_idempotent_and_deduplicated() {
        let text = "SARAH waves. SARAH laughs. JONES nods.";
        let first = extract_characters(text);
        let second = extract_characters(text);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn uppercase_runs_respect_word_boundaries() {
        // An uppercase tail inside a mixed-case word is not a name.
        assert!(extract_characters("McDONALD enters.").is_empty());
        // Single letters are too short.
        assert!(extract_characters("A plan.").is_empty());
        // Runs may span spaces.
        let names = extract_characters("OLD MAN shuffles past.");
        assert!(names.contains("OLD MAN"));
    }
}
