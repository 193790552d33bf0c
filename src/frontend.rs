/// Terminal front end
/// Single UI loop over stdin lines and workbench events. Colon commands map
/// to workbench commands; any other line goes to the running debugger.

use crossbeam_channel::{select, Receiver};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;

use crate::commands;
use crate::commands::explorer::explorer_text;
use crate::models::{SessionState, TabId, TokenKind};
use crate::services::tabs::{CloseDecision, CloseOutcome};
use crate::workbench::Workbench;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
commands:
  :new                 new untitled tab
  :open <path>         open a file
  :save                save the active tab
  :saveas <path>       save the active tab under a new name
  :close [save|discard] close the active tab
  :tabs                list tabs
  :tab <id>            switch tab
  :show                print the active buffer, highlighted
  :append <text>       append a line to the active buffer
  :undo                undo the last edit
  :redo                redo the last undone edit
  :run                 run the active file
  :debug               debug the active file
  :stop                stop the debugger
  :folder <path>       open a folder in the explorer
  :ls                  show the explorer
  :explore <n>         open explorer entry n
  :complete            completions for the word at the end of the buffer
  :menu [n]            list or run plugin menu entries
  :quit                exit
anything else is sent to the debugger while it runs";

/// Read stdin lines on a worker thread
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("stdin closed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Drive the workbench until `:quit` or end of input
pub fn run_console(wb: &mut Workbench, input: Receiver<String>, out: &mut impl Write) -> io::Result<()> {
    let events = wb.events().clone();
    flush(wb, out)?;

    loop {
        select! {
            recv(input) -> line => match line {
                Ok(line) => {
                    if handle_line(wb, &line, out)? == Flow::Quit {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(events) -> event => {
                if let Ok(event) = event {
                    wb.apply(event);
                }
            }
        }
        flush(wb, out)?;
    }

    wb.shutdown();
    flush(wb, out)
}

/// Print new log lines and tab title changes
pub fn flush(wb: &mut Workbench, out: &mut impl Write) -> io::Result<()> {
    for (id, title) in wb.take_title_changes() {
        writeln!(out, "[tab {}] {}", id, title)?;
    }
    for line in wb.take_log_updates() {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}

pub fn handle_line(wb: &mut Workbench, line: &str, out: &mut impl Write) -> io::Result<Flow> {
    let Some(command) = line.strip_prefix(':') else {
        if wb.debug_state() == SessionState::Running {
            commands::debug_input(wb, line);
        } else if !line.trim().is_empty() {
            wb.log_output("[INFO] Not debugging. Type :help for commands.");
        }
        return Ok(Flow::Continue);
    };

    let (name, raw) = command.split_once(' ').unwrap_or((command.trim(), ""));
    let arg = raw.trim();

    match name {
        "new" => {
            commands::new_file(wb);
        }
        "open" if !arg.is_empty() => {
            commands::open_file(wb, Path::new(arg));
        }
        "save" => {
            commands::save_file(wb);
        }
        "saveas" if !arg.is_empty() => {
            commands::save_as(wb, Path::new(arg));
        }
        "close" => {
            let decision = match arg {
                "save" => CloseDecision::Save,
                "discard" => CloseDecision::Discard,
                _ => CloseDecision::Ask,
            };
            if commands::close_current_tab(wb, decision) == CloseOutcome::NeedsDecision {
                writeln!(out, "use :close save or :close discard")?;
            }
        }
        "tabs" => {
            let active = wb.tabs().active_id();
            for buffer in wb.tabs().iter() {
                let marker = if Some(buffer.id()) == active { '>' } else { ' ' };
                writeln!(out, "{} {} {}", marker, buffer.id().0, buffer.title())?;
            }
        }
        "tab" => match arg.parse::<u64>() {
            Ok(id) if wb.tabs.activate(TabId(id)) => {}
            _ => wb.log_output(&format!("[ERROR] No tab {}", arg)),
        },
        "show" => show_active(wb, out)?,
        "append" => {
            if let Some(buffer) = wb.tabs.active_mut() {
                let mut content = buffer.content().to_string();
                if !content.is_empty() && !content.ends_with('\n') {
                    content.push('\n');
                }
                content.push_str(raw.trim_end());
                content.push('\n');
                buffer.on_user_edit(content);
            }
        }
        "undo" => {
            commands::undo(wb);
        }
        "redo" => {
            commands::redo(wb);
        }
        "run" => {
            commands::run_current(wb);
        }
        "debug" => {
            commands::debug_current(wb);
        }
        "stop" => commands::stop_debugger(wb),
        "folder" if !arg.is_empty() => {
            if commands::open_folder(wb, Path::new(arg)) {
                print_explorer(wb, out)?;
            }
        }
        "ls" => {
            commands::refresh_explorer(wb);
            print_explorer(wb, out)?;
        }
        "explore" => match arg.parse::<usize>() {
            Ok(index) => {
                commands::open_explorer_entry(wb, index);
            }
            Err(_) => wb.log_output("[ERROR] :explore needs an entry number"),
        },
        "complete" => {
            let cursor = wb.tabs().active().map_or(0, |b| b.content().trim_end().len());
            let suggestions = commands::complete_at(wb, cursor);
            writeln!(out, "{}", suggestions.join("  "))?;
        }
        "menu" if arg.is_empty() => {
            if wb.menu().is_empty() {
                writeln!(out, "No plugins loaded")?;
            }
            for (index, entry) in wb.menu().iter().enumerate() {
                writeln!(out, "{} {}", index, entry.label)?;
            }
        }
        "menu" => match arg.parse::<usize>() {
            Ok(index) => {
                commands::invoke_menu(wb, index);
            }
            Err(_) => wb.log_output("[ERROR] :menu needs an entry number"),
        },
        "help" => writeln!(out, "{}", HELP)?,
        "quit" | "q" => return Ok(Flow::Quit),
        _ => wb.log_output(&format!("[ERROR] Unknown command :{}. Type :help.", command)),
    }

    Ok(Flow::Continue)
}

fn print_explorer(wb: &Workbench, out: &mut impl Write) -> io::Result<()> {
    if let Some(text) = explorer_text(wb) {
        // Number entries so :explore can refer to them
        for (index, line) in text.lines().enumerate() {
            if index == 0 {
                writeln!(out, "{}", line)?;
            } else {
                writeln!(out, "{:>3}{}", index - 1, line)?;
            }
        }
    }
    Ok(())
}

/// Wrap `text` in a 24-bit colour escape for `kind`
fn paint(kind: TokenKind, text: &str) -> String {
    let Some(hex) = kind.color() else {
        return text.to_string();
    };
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(255);
    format!(
        "\x1b[38;2;{};{};{}m{}\x1b[0m",
        channel(1),
        channel(3),
        channel(5),
        text
    )
}

/// Highlighted text of the active buffer, with line numbers
pub fn render_active(wb: &Workbench) -> Option<String> {
    let buffer = wb.tabs().active()?;

    let mut painted = String::new();
    for span in buffer.highlighting_tokens(wb.tokenizer()) {
        // Colour each line piece on its own so line numbers stay plain
        let pieces: Vec<String> = span.text.split('\n').map(|p| paint(span.kind, p)).collect();
        painted.push_str(&pieces.join("\n"));
    }

    let width = buffer.line_count().to_string().len();
    let numbered: Vec<String> = painted
        .split('\n')
        .enumerate()
        .map(|(i, line)| format!("{:>width$} | {}", i + 1, line, width = width))
        .collect();
    Some(format!("--- {} ---\n{}", buffer.title(), numbered.join("\n")))
}

fn show_active(wb: &Workbench, out: &mut impl Write) -> io::Result<()> {
    match render_active(wb) {
        Some(text) => writeln!(out, "{}", text),
        None => writeln!(out, "no file open"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn run_lines(wb: &mut Workbench, lines: &[&str]) -> String {
        let mut out = Vec::new();
        for line in lines {
            handle_line(wb, line, &mut out).unwrap();
            wb.pump();
            flush(wb, &mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn edit_and_save_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.py");
        let mut wb = Workbench::new(Config::default());

        let out = run_lines(
            &mut wb,
            &[
                ":new",
                ":append x = 1",
                ":tabs",
                &format!(":saveas {}", path.display()),
            ],
        );

        assert!(out.contains("[tab #1] Untitled-1*"));
        assert!(out.contains("> 1 Untitled-1*"));
        assert!(out.contains("[tab #1] demo.py"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1\n");
    }

    #[test]
    fn show_renders_numbered_lines() {
        let mut wb = Workbench::new(Config::default());
        run_lines(&mut wb, &[":new", ":append def f():", ":append     return 2"]);

        assert_eq!(wb.tabs().active().unwrap().content(), "def f():\n    return 2\n");
        let rendered = render_active(&wb).unwrap();
        assert!(rendered.starts_with("--- Untitled-1* ---\n"));
        assert!(rendered.contains("1 | \x1b[38;2;86;156;214mdef\x1b[0m"));
        assert!(rendered.contains("\n2 | "));
    }

    #[test]
    fn plain_line_without_debugger_gets_hint() {
        let mut wb = Workbench::new(Config::default());
        let out = run_lines(&mut wb, &["next"]);
        assert!(out.contains("Not debugging"));
    }

    #[test]
    fn dirty_close_prompts_and_quit_stops() {
        let mut wb = Workbench::new(Config::default());
        let out = run_lines(&mut wb, &[":new", ":append y", ":close"]);
        assert!(out.contains("use :close save or :close discard"));

        let mut sink = Vec::new();
        assert_eq!(handle_line(&mut wb, ":quit", &mut sink).unwrap(), Flow::Quit);
    }

    #[test]
    fn console_loop_ends_with_input() {
        let mut wb = Workbench::new(Config::default());
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(":new".to_string()).unwrap();
        tx.send(":tabs".to_string()).unwrap();
        drop(tx);

        let mut out = Vec::new();
        run_console(&mut wb, rx, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(">>> Ball Python IDE Terminal - Ready"));
        assert!(text.contains("> 1 Untitled-1"));
    }

    #[test]
    fn undo_and_redo_commands() {
        let mut wb = Workbench::new(Config::default());
        run_lines(&mut wb, &[":new", ":append a = 1", ":append b = 2", ":undo"]);
        assert_eq!(wb.tabs().active().unwrap().content(), "a = 1\n");

        let out = run_lines(&mut wb, &[":redo", ":redo"]);
        assert_eq!(wb.tabs().active().unwrap().content(), "a = 1\nb = 2\n");
        assert!(out.contains("[INFO] Nothing to redo."));
    }
}
