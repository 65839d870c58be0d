//! Line-oriented prompts.
//!
//! Every read returns `Ok(None)` at end of input so callers can save and
//! exit cleanly when stdin closes.

use adventure_core::SpellChooser;
use std::io::{self, BufRead, Write};

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` and read one trimmed line.
    pub fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }

    /// Ask until the answer names one of `options` (case-insensitive).
    pub fn choose(&mut self, prompt: &str, options: &[String]) -> io::Result<Option<String>> {
        let listing = options.join("/");
        loop {
            let Some(answer) = self.ask(&format!("{prompt} ({listing}): "))? else {
                return Ok(None);
            };
            if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(&answer)) {
                return Ok(Some(option.clone()));
            }
            self.say(&format!("Please choose one of: {}", options.join(", ")))?;
        }
    }

    pub fn yes_no(&mut self, prompt: &str) -> io::Result<Option<bool>> {
        loop {
            let Some(answer) = self.ask(&format!("{prompt} [y/n]: "))? else {
                return Ok(None);
            };
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => self.say("Please enter y or n.")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> SpellChooser for Console<R, W> {
    fn choose(&mut self, level: u32, options: &[String]) -> String {
        let prompt = format!("Choose a new spell (level {level})");
        match Console::choose(self, &prompt, options) {
            Ok(Some(spell)) => spell,
            _ => options.first().cloned().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask_trims_and_detects_eof() {
        let mut c = console("  go north \n");
        assert_eq!(c.ask("> ").unwrap().as_deref(), Some("go north"));
        assert_eq!(c.ask("> ").unwrap(), None);
    }

    #[test]
    fn test_choose_retries_until_valid() {
        let mut c = console("bard\nwizard\n");
        let options = vec!["Fighter".to_string(), "Wizard".to_string()];
        assert_eq!(
            c.choose("Choose a class", &options).unwrap().as_deref(),
            Some("Wizard")
        );
        let shown = String::from_utf8(c.output).unwrap();
        assert!(shown.contains("Choose a class (Fighter/Wizard): "));
        assert!(shown.contains("Please choose one of: Fighter, Wizard"));
    }

    #[test]
    fn test_yes_no() {
        let mut c = console("maybe\nY\n");
        assert_eq!(c.yes_no("Resume?").unwrap(), Some(true));
    }

    #[test]
    fn test_spell_chooser_falls_back_to_first_on_eof() {
        let mut c = console("");
        let options = vec!["Shield".to_string(), "Sleep".to_string()];
        assert_eq!(SpellChooser::choose(&mut c, 2, &options), "Shield");
    }
}
