use std::collections::HashMap;

use crate::data::catalog::ContentLibrary;
use crate::data::clues::ClueVisibility;

pub fn render_authoring_dashboard(library: &ContentLibrary) -> String {
    let mut output = String::new();
    output.push_str("=== Authoring Console ===\n");

    let fake_clues = library.clues.values().filter(|clue| clue.is_fake).count();
    let mut visibility_counts: HashMap<ClueVisibility, usize> = HashMap::new();
    for clue in library.clues.values() {
        *visibility_counts.entry(clue.visibility).or_insert(0) += 1;
    }
    output.push_str("Clues\n");
    output.push_str(&format!(
        "  Total: {} (fake: {})\n",
        library.clues.len(),
        fake_clues
    ));
    let mut visibility: Vec<(ClueVisibility, usize)> = visibility_counts.into_iter().collect();
    visibility.sort_by_key(|(visibility, _)| format!("{:?}", visibility));
    for (visibility, count) in visibility {
        output.push_str(&format!("    {:?}: {}\n", visibility, count));
    }

    output.push_str("\nQuestions\n");
    output.push_str(&format!("  Total: {}\n", library.questions.len()));
    let mut category_counts: HashMap<String, usize> = HashMap::new();
    let mut gated_answers = 0usize;
    let mut flag_gated_answers = 0usize;
    for question in library.questions.values() {
        *category_counts.entry(question.category.clone()).or_insert(0) += 1;
        for answer in question.answers() {
            if !answer.required_clues.is_empty() {
                gated_answers += 1;
            }
            if answer.unlock_flag.is_some() {
                flag_gated_answers += 1;
            }
        }
    }
    if !category_counts.is_empty() {
        output.push_str("  Categories:\n");
        let mut categories: Vec<(String, usize)> = category_counts.into_iter().collect();
        categories.sort_by(|a, b| a.0.cmp(&b.0));
        for (category, count) in categories {
            output.push_str(&format!("    {}: {}\n", category, count));
        }
    }
    output.push_str(&format!("  Clue-gated answers: {}\n", gated_answers));
    output.push_str(&format!("  Flag-gated answers: {}\n", flag_gated_answers));

    output.push_str("\nDialogue\n");
    let lines: usize = library.sequences.values().map(|s| s.lines.len()).sum();
    let gated_lines = library
        .sequences
        .values()
        .flat_map(|s| s.lines.iter())
        .filter(|line| !line.conditions.is_empty())
        .count();
    output.push_str(&format!(
        "  Sequences: {} (lines: {}, gated: {})\n",
        library.sequences.len(),
        lines,
        gated_lines
    ));
    output.push_str(&format!("  Speakers: {}\n", library.speakers.len()));
    let entries: usize = library
        .interactables
        .values()
        .map(|i| i.dialogues.len())
        .sum();
    let play_once = library
        .interactables
        .values()
        .flat_map(|i| i.dialogues.iter())
        .filter(|entry| entry.play_once)
        .count();
    output.push_str(&format!(
        "  Interactables: {} (entries: {}, play-once: {})\n",
        library.interactables.len(),
        entries,
        play_once
    ));

    output.push_str("\nMusic\n");
    let invalid_tracks = library.tracks.values().filter(|t| !t.is_valid()).count();
    output.push_str(&format!(
        "  Tracks: {} (unplayable: {})\n",
        library.tracks.len(),
        invalid_tracks
    ));
    output.push_str(&format!("  Scenes: {}\n", library.scenes.len()));

    let warnings = library.lint();
    if !warnings.is_empty() {
        output.push_str(&format!("\nWarnings ({})\n", warnings.len()));
        for warning in warnings {
            output.push_str(&format!("  {}\n", warning));
        }
    }

    output
}
