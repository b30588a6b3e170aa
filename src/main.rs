use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use casebook::audio::{MusicEvent, RecordingOutput};
use casebook::config::{load_config, GameConfig};
use casebook::core::world::{Game, Snapshot};
use casebook::data::{load_content_catalog, ClueId, ContentLibrary, QuestionId, SequenceId, BLANK};
use casebook::dialogue::DialogueEvent;
use casebook::persistence::{open_repository, SaveRepository};
use casebook::ui::authoring::render_authoring_dashboard;
use tracing_subscriber::EnvFilter;

const COMMANDS: &str = "Commands: flags | flag <name> | clue <id> | clues | talk <object> | show <sequence> | advance | close | popup | board | options <q> | answer <q> <text> | switch | scene <id> | music | sting <track> | resume | stop [now] | speed <scale> | pause | unpause | tick [seconds] | save | load | authoring | quit";

struct Paths {
    content: PathBuf,
    save: PathBuf,
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("casebook=info")),
        )
        .init();

    println!("Initializing Casebook (Narrative Debug)...");
    let paths = parse_paths(env::args().collect());

    let config = match &paths.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config: {}", err);
                GameConfig::default()
            }
        },
        None => GameConfig::default(),
    };

    let catalog = match load_content_catalog(&paths.content) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!(
                "{}. Use --content <path> to point at a valid content file.",
                err
            );
            std::process::exit(1);
        }
    };
    let library = ContentLibrary::from_catalog(catalog);

    let mut repo: Box<dyn SaveRepository> = match open_repository(&paths.save) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("Failed to open save store: {}", err);
            std::process::exit(1);
        }
    };

    let mut game = Game::new(library, config);
    let mixer = RecordingOutput::new();
    game.set_audio_output(mixer.clone());

    let opening = game.library().start_scene.clone();
    if let Some(scene) = opening {
        game.change_scene(&scene);
    }
    let snapshot = game.snapshot();
    print_snapshot(&snapshot);

    println!("{}", COMMANDS);
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" => break,
            "help" => println!("{}", COMMANDS),
            "flags" => {
                let flags = game.flags();
                if flags.is_empty() {
                    println!("No flags set.");
                }
                for flag in flags {
                    println!("  {}", flag);
                }
            }
            "flag" => match parts.next() {
                Some(name) => {
                    if game.set_flag(name) {
                        println!("Set {}", name);
                    } else {
                        println!("{} already set", name);
                    }
                }
                None => println!("Usage: flag <name>"),
            },
            "clue" => match parts.next().map(str::parse::<u32>) {
                Some(Ok(id)) => {
                    if game.discover_clue(ClueId(id)) {
                        println!("Discovered clue #{}", id);
                    } else {
                        println!("Clue #{} unknown or already found", id);
                    }
                }
                _ => println!("Usage: clue <id>"),
            },
            "clues" => print_journal(&game),
            "talk" => match parts.next() {
                Some(object) => match game.interact(object) {
                    Some(sequence) => println!("Playing {}", sequence),
                    None => println!("Nothing to say about {}", object),
                },
                None => println!("Usage: talk <object>"),
            },
            "show" => match parts.next() {
                Some(sequence) => {
                    if !game.show_dialogue(&SequenceId::from(sequence)) {
                        println!("Unknown sequence {}", sequence);
                    }
                }
                None => println!("Usage: show <sequence>"),
            },
            "advance" | "a" => {
                if !game.advance_dialogue() {
                    println!("Nothing to advance.");
                }
            }
            "close" => game.force_close_dialogue(),
            "popup" => match game.dismiss_clue_popup() {
                Some(next) => println!("Next popup: clue {}", next),
                None => println!("No more popups."),
            },
            "board" => print_board(&game),
            "options" => match parts.next().map(str::parse::<u32>) {
                Some(Ok(id)) => {
                    let options = game.answer_options(QuestionId(id));
                    if options.is_empty() {
                        println!("No answers available for Q{}", id);
                    }
                    for option in options {
                        println!("  {}", option);
                    }
                }
                _ => println!("Usage: options <question_id>"),
            },
            "answer" => {
                let id = parts.next().map(str::parse::<u32>);
                let text = parts.collect::<Vec<_>>().join(" ");
                match id {
                    Some(Ok(id)) if !text.is_empty() => {
                        match game.submit_answer(QuestionId(id), &text) {
                            Some(true) => println!("Correct."),
                            Some(false) => println!("Not quite."),
                            None => println!("Unknown question Q{}", id),
                        }
                    }
                    _ => println!("Usage: answer <question_id> <text>"),
                }
            }
            "switch" => {
                let character = game.switch_character();
                println!("Now playing as {}", character);
            }
            "scene" => match parts.next() {
                Some(scene) => {
                    if !game.change_scene(scene) {
                        println!("Already in {}", scene);
                    }
                }
                None => println!("Scene: {}", game.scene().unwrap_or("(none)")),
            },
            "music" => {
                println!(
                    "Music: {:?} at {:.3}s",
                    game.music_state(),
                    game.dsp_seconds()
                );
                for command in mixer.commands().iter().rev().take(6).rev() {
                    println!("  {:?}", command);
                }
            }
            "sting" => match parts.next() {
                Some(track) => {
                    if !game.play_one_shot(track) {
                        println!("Cannot play {}", track);
                    }
                }
                None => println!("Usage: sting <track>"),
            },
            "resume" => {
                if !game.return_to_scene_music() {
                    println!("No scene music to return to.");
                }
            }
            "stop" => {
                let fade = parts.next() != Some("now");
                game.stop_music(fade);
                println!("Music: {:?}", game.music_state());
            }
            "speed" => match parts.next().and_then(|raw| raw.parse::<f32>().ok()) {
                Some(scale) => {
                    game.set_time_scale(scale);
                    println!("Time scale set to {:.2} (dialogue keeps real time).", scale.max(0.0));
                }
                None => println!("Usage: speed <scale>"),
            },
            "pause" => game.set_paused(true),
            "unpause" => game.set_paused(false),
            "tick" => {
                let seconds = parts
                    .next()
                    .and_then(|raw| raw.parse::<f32>().ok())
                    .unwrap_or(1.0);
                let steps = (seconds / 0.05).ceil().max(1.0) as u32;
                for _ in 0..steps {
                    let snapshot = game.tick(seconds / steps as f32);
                    print_events(&snapshot);
                }
                let snapshot = game.snapshot();
                print_snapshot(&snapshot);
                continue;
            }
            "save" => match game.save_to(repo.as_mut()) {
                Ok(()) => println!("Saved to {}", paths.save.display()),
                Err(err) => println!("Save failed: {}", err),
            },
            "load" => match game.load_from(repo.as_mut()) {
                Ok(true) => println!("Loaded {}", paths.save.display()),
                Ok(false) => println!("No save at {}", paths.save.display()),
                Err(err) => println!("Load failed: {}", err),
            },
            "authoring" => print!("{}", render_authoring_dashboard(game.library())),
            _ => {
                println!("Unknown command. {}", COMMANDS);
                continue;
            }
        }

        let snapshot = game.snapshot();
        print_events(&snapshot);
        print_snapshot(&snapshot);
    }
}

fn parse_paths(args: Vec<String>) -> Paths {
    let mut iter = args.iter();
    let mut paths = Paths {
        content: PathBuf::from("./assets/content/case01.json"),
        save: PathBuf::from("./saves/case01.json"),
        config: None,
    };
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--content" => {
                if let Some(value) = iter.next() {
                    paths.content = PathBuf::from(value);
                }
            }
            "--save" => {
                if let Some(value) = iter.next() {
                    paths.save = PathBuf::from(value);
                }
            }
            "--config" => {
                if let Some(value) = iter.next() {
                    paths.config = Some(PathBuf::from(value));
                }
            }
            _ => {}
        }
    }
    paths
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "[{} @ {}] flags={} clues={} music={:?}{}",
        snapshot.character,
        snapshot.scene.as_deref().unwrap_or("-"),
        snapshot.flags,
        snapshot.clues_found,
        snapshot.music_state,
        snapshot
            .music_track
            .as_deref()
            .map(|track| format!(" ({})", track))
            .unwrap_or_default()
    );
    if let Some(dialogue) = &snapshot.dialogue {
        println!(
            "  {}: {} [{:?}, {} queued]",
            dialogue.speaker.as_deref().unwrap_or("..."),
            dialogue.text,
            dialogue.phase,
            snapshot.queued_lines
        );
    }
    if let Some(clue) = snapshot.clue_popup {
        println!(
            "  New clue {} ({} more waiting, `popup` to dismiss)",
            clue, snapshot.pending_popups
        );
    }
}

fn print_events(snapshot: &Snapshot) {
    for event in &snapshot.dialogue_events {
        match event {
            DialogueEvent::SequenceCompleted { sequence } => println!("  (finished {})", sequence),
            DialogueEvent::Closed => println!("  (dialogue closed)"),
            _ => {}
        }
    }
    for event in &snapshot.music_events {
        match event {
            MusicEvent::HandoffToLoop { track, at, .. } => {
                println!("  (music {} looping from {:.3}s)", track, at)
            }
            MusicEvent::TrackFinished { track } => println!("  (music {} finished)", track),
            _ => {}
        }
    }
}

fn print_journal(game: &Game) {
    let journal = game.journal();
    if journal.is_empty() {
        println!("Journal is empty.");
        return;
    }
    for clue in journal {
        println!(
            "  {} {}{}: {}",
            clue.number,
            clue.name,
            if clue.is_fake { " (fake)" } else { "" },
            clue.description
        );
    }
}

fn print_board(game: &Game) {
    let questions = game.visible_questions();
    if questions.is_empty() {
        println!("The board is empty.");
        return;
    }
    let mut category = "";
    for question in &questions {
        if question.category != category {
            category = question.category.as_str();
            println!("{}", category);
        }
        let line = match game.answer(question.id) {
            Some(answer) => format!(
                "{} {}",
                question.filled(&answer.text),
                if answer.correct { "[correct]" } else { "[wrong]" }
            ),
            None => question.text.replace(BLANK, "_____"),
        };
        println!("  {} {}", question.id, line);
    }
    if game.is_case_solved() {
        println!("Case solved.");
    }
}
