//! Terminal output helpers.

use adventure_core::Narration;
use crossterm::style::Stylize;
use std::io::IsTerminal;

/// How a line should be colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Good,
    Warning,
    Danger,
    Companion,
    Hint,
}

fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

pub fn paint(text: &str, tone: Tone) -> String {
    if !color_enabled() {
        return text.to_string();
    }
    match tone {
        Tone::Plain => text.to_string(),
        Tone::Good => text.green().to_string(),
        Tone::Warning => text.yellow().to_string(),
        Tone::Danger => text.red().to_string(),
        Tone::Companion => text.cyan().to_string(),
        Tone::Hint => text.dark_grey().to_string(),
    }
}

/// Pick a tone from the wording of a rules result.
pub fn outcome_tone(text: &str) -> Tone {
    let lowered = text.to_lowercase();
    let has = |word: &str| lowered.contains(word);
    if has("damage") && (has("strikes") || has("lashes at")) {
        return Tone::Danger;
    }
    if has("game over") || has("collapse") || has("dead") {
        return Tone::Danger;
    }
    if has("miss") || has("fails") || has("no effect") || has("out of") {
        return Tone::Warning;
    }
    if has("hit") || has("damage") || has("healing") || has("heals") {
        return Tone::Good;
    }
    Tone::Plain
}

pub fn divider() {
    println!("{}", "-".repeat(60));
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

pub fn show_narration(narration: &Narration) {
    if let Some(outcomes) = &narration.outcomes {
        println!();
        println!("{}", paint(outcomes, outcome_tone(outcomes)));
        println!();
    }
    if let Some(content) = &narration.campaign_content {
        println!("{}", paint(content, Tone::Companion));
    }
    divider();
    println!("{}", narration.entry.gm_response);
    println!();
    if narration.loot_tip {
        println!("{}", paint("Tip: You can 'loot' the corpse.", Tone::Hint));
        println!();
    }
}
