use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::Colorize;
use fb_core::{Segment, SessionId, StoryMetadata};
use fb_reader::{
    BlockReason, ControllerError, GateSnapshot, Navigation, Progress, ProgressionController,
    ReaderConfig, StoryBackend,
};

pub fn run(store_path: &Path, metadata: StoryMetadata, api_url: Option<&str>) -> Result<(), String> {
    let store = super::open_store(store_path)?.shared();
    let backend = super::backend(api_url)?;
    let controller = ProgressionController::new(store, backend, ReaderConfig::default());

    super::runtime()?.block_on(async {
        println!("  {} a new story...\n", "Starting".bold());
        let id = controller
            .start_story(metadata)
            .await
            .map_err(|e| format!("cannot start story: {e}"))?;
        save(store_path, &controller)?;
        interact(&controller, store_path, &id).await
    })
}

/// A reader command typed at the prompt. Indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Choose(usize),
    Answer(usize, usize),
    Submit,
    Retry,
    End,
    Goto(usize),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    let mut number = |what: &str| -> Result<usize, String> {
        let raw = words.next().ok_or_else(|| format!("missing {what} number"))?;
        raw.parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| n - 1)
            .ok_or_else(|| format!("{what} must be a number starting at 1, got \"{raw}\""))
    };

    match command.as_str() {
        "choose" | "c" => Ok(Input::Choose(number("choice")?)),
        "answer" | "a" => {
            let question = number("question")?;
            Ok(Input::Answer(question, number("option")?))
        }
        "submit" | "s" => Ok(Input::Submit),
        "retry" | "r" => Ok(Input::Retry),
        "end" => Ok(Input::End),
        "goto" | "g" => Ok(Input::Goto(number("part")?)),
        "status" => Ok(Input::Status),
        "help" | "h" | "?" => Ok(Input::Help),
        "quit" | "q" | "exit" => Ok(Input::Quit),
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Input::Choose(n - 1)),
            _ => Err(format!("unknown command \"{other}\". Type 'help' for commands.")),
        },
    }
}

/// The prompt loop shared by `read` and `resume`.
pub(super) async fn interact<B: StoryBackend>(
    controller: &ProgressionController<B>,
    store_path: &Path,
    id: &SessionId,
) -> Result<(), String> {
    show_position(controller, id)?;
    println!("  Type 'help' for commands, 'quit' to exit.\n");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let command = match parse_input(input) {
            Ok(Input::Quit) => break,
            Ok(command) => command,
            Err(e) => {
                println!("{}\n", e.yellow());
                continue;
            }
        };

        if let Err(e) = step(controller, store_path, id, command).await {
            println!("{}\n", e.yellow());
        }
    }

    println!("  Story saved. Continue later with `fabula resume {id}`.");
    Ok(())
}

async fn step<B: StoryBackend>(
    controller: &ProgressionController<B>,
    store_path: &Path,
    id: &SessionId,
    command: Input,
) -> Result<(), String> {
    match command {
        Input::Choose(n) => {
            let position = controller.position(id).map_err(describe)?;
            let choice = {
                let store = controller.store().borrow();
                let session = store.get_session(id).map_err(|e| e.to_string())?;
                session
                    .segment(position)
                    .and_then(|s| s.next_choices.get(n))
                    .cloned()
                    .ok_or_else(|| format!("there is no choice {} here", n + 1))?
            };
            println!("  {}\n", "The story continues...".dimmed());
            let progress = controller
                .request_choice(id, position, &choice)
                .await
                .map_err(describe)?;
            after_progress(controller, store_path, id, progress)
        }
        Input::End => {
            let position = controller.position(id).map_err(describe)?;
            println!("  {}\n", "Wrapping the story up...".dimmed());
            let progress = controller
                .request_end_story(id, position)
                .await
                .map_err(describe)?;
            after_progress(controller, store_path, id, progress)
        }
        Input::Answer(question, option) => {
            controller
                .answer(id, question, option)
                .map_err(describe)?;
            println!(
                "  Picked option {} for question {}.\n",
                option + 1,
                question + 1
            );
            Ok(())
        }
        Input::Submit => {
            let submission = controller.submit(id).map_err(describe)?;
            if !submission.all_answered {
                println!(
                    "{}\n",
                    "Answer every question before submitting.".yellow()
                );
                return Ok(());
            }
            save(store_path, controller)?;
            println!(
                "  You got {} of {} right.",
                submission.correct_count, submission.total
            );
            if let Some(gate) = controller.gate_snapshot(id).map_err(describe)? {
                print_gate_status(&gate);
            }
            Ok(())
        }
        Input::Retry => {
            controller.retry(id).map_err(describe)?;
            save(store_path, controller)?;
            println!("  Answers cleared. Have another go!\n");
            show_position(controller, id)
        }
        Input::Goto(target) => match controller.navigate(id, target).map_err(describe)? {
            Navigation::Moved(_) => show_position(controller, id),
            Navigation::Refused(current) => Err(format!(
                "you can't go to part {} from part {}",
                target + 1,
                current + 1
            )),
        },
        Input::Status => show_position(controller, id),
        Input::Help => {
            print_help();
            Ok(())
        }
        Input::Quit => Ok(()),
    }
}

fn after_progress<B: StoryBackend>(
    controller: &ProgressionController<B>,
    store_path: &Path,
    id: &SessionId,
    progress: Progress,
) -> Result<(), String> {
    match progress {
        Progress::Advanced { .. } => {
            save(store_path, controller)?;
            show_position(controller, id)
        }
        Progress::Blocked(reason) => Err(blocked_message(reason).to_string()),
    }
}

fn save<B: StoryBackend>(store_path: &Path, controller: &ProgressionController<B>) -> Result<(), String> {
    super::save_store(store_path, &controller.store().borrow())
}

fn blocked_message(reason: BlockReason) -> &'static str {
    match reason {
        BlockReason::ComprehensionRequired => {
            "Answer the questions about this part first. Type 'status' to see them."
        }
        BlockReason::AlreadyCompleted => "This story has already ended.",
        BlockReason::ExtensionInFlight => "Still waiting for the story to continue.",
    }
}

fn describe(err: ControllerError) -> String {
    match err {
        ControllerError::Extension(e) => {
            format!("the story could not continue ({e}). Nothing was lost, try again.")
        }
        ControllerError::StaleSegment { last, .. } => {
            format!("go to the newest part first (type 'goto {}')", last + 1)
        }
        other => other.to_string(),
    }
}

/// Print the segment the reader is on, with its questions and choices.
pub(super) fn show_position<B: StoryBackend>(
    controller: &ProgressionController<B>,
    id: &SessionId,
) -> Result<(), String> {
    let position = controller.position(id).map_err(describe)?;
    let gate = controller.gate_snapshot(id).map_err(describe)?;

    let store = controller.store().borrow();
    let session = store.get_session(id).map_err(|e| e.to_string())?;
    let Some(segment) = session.segment(position) else {
        return Ok(());
    };

    super::show::print_segment(position, segment);
    if let Some(gate) = &gate {
        print_questions(segment, gate);
    }

    if session.completed && position + 1 == session.len() {
        println!("  {}\n", "The End.".bold());
    } else if position + 1 == session.len() {
        print_choices(segment);
    } else {
        println!(
            "  {}\n",
            format!("Part {} of {}.", position + 1, session.len()).dimmed()
        );
    }
    Ok(())
}

fn print_choices(segment: &Segment) {
    println!("  {}", "What happens next?".bold());
    for (i, choice) in segment.next_choices.iter().enumerate() {
        println!("    {}) {}", i + 1, choice.description);
    }
    println!("  Or type 'end' to finish the story here.\n");
}

fn print_questions(segment: &Segment, gate: &GateSnapshot) {
    println!(
        "  {} (attempt {} of {})",
        "Questions".bold(),
        (gate.attempts + 1).min(gate.max_attempts),
        gate.max_attempts
    );
    for (q, question) in segment.comprehension_questions.iter().enumerate() {
        println!("  {}. {}", q + 1, question.prompt);
        for (o, option) in question.options.iter().enumerate() {
            let marker = if gate.answers.get(&q) == Some(&o) {
                "*"
            } else {
                " "
            };
            println!("     {marker} {}) {option}", o + 1);
        }
    }
    print_gate_status(gate);
}

fn print_gate_status(gate: &GateSnapshot) {
    let status = match gate.last_score {
        Some(score) if gate.passed && score.is_perfect() => {
            "All correct! Choose what happens next.".green().to_string()
        }
        Some(_) if gate.can_retry => {
            "Type 'retry' to try again, or choose what happens next."
                .to_string()
        }
        _ if gate.passed => "Choose what happens next.".to_string(),
        _ if gate.satisfied => "No tries left, but you may go on.".to_string(),
        _ => "Use 'answer <question> <option>', then 'submit'.".to_string(),
    };
    println!("  {status}\n");
}

fn print_help() {
    println!("  Commands:");
    println!("    choose <n>              Pick choice n (or just type n)");
    println!("    answer <q> <option>     Answer question q");
    println!("    submit                  Check your answers");
    println!("    retry                   Clear your answers and try again");
    println!("    end                     Finish the story here");
    println!("    goto <part>             Jump ahead to a part already written");
    println!("    status                  Show where you are");
    println!("    quit                    Save and leave");
    println!();
}
