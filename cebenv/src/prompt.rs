use std::io::{self, BufRead, Stderr, StdinLock, Write};

use anstyle::{AnsiColor, Color, Style};
use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

const NEXT: &str = "next";
const BACK: &str = "back";

/// One page of options returned by a paged listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
  pub options: Vec<String>,
  /// Continuation token for the following page, if there is one
  pub next_token: Option<String>,
}

/// Source of paged options, such as a paginated API listing
#[async_trait]
pub trait PageSource: Send {
  /// Fetch the page for the continuation token; `None` when nothing is available
  async fn fetch(&mut self, token: Option<String>) -> Result<Option<Page>>;
}

fn instruction() -> Style {
  Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Cyan)))
}

fn error() -> Style {
  Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red)))
}

/// Numbered-list selection over a line based terminal
#[derive(Debug)]
pub struct Prompt<R, W> {
  input: R,
  output: W,
  color: bool,
}

impl Prompt<StdinLock<'static>, Stderr> {
  /// Prompt on stderr and read answers from stdin
  pub fn stdio(color: bool) -> Self {
    Self::new(io::stdin().lock(), io::stderr(), color)
  }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
  pub fn new(input: R, output: W, color: bool) -> Self {
    Self { input, output, color }
  }

  fn paint(&self, style: Style, text: &str) -> String {
    match self.color {
      true => format!("{}{text}{}", style.render(), style.render_reset()),
      false => text.to_string(),
    }
  }

  fn render(&mut self, description: &str, options: &[String], next: bool, back: bool) -> Result<()> {
    let mut text = format!("\n{}\n", self.paint(instruction(), description));
    for (i, option) in options.iter().enumerate() {
      text.push_str(&format!("{i}) {option}\n"));
    }
    if next || back {
      text.push('\n');
    }
    if next {
      text.push_str("Or type 'Next' to continue\n");
    }
    if back {
      text.push_str("Or type 'Back' to go back\n");
    }
    text.push_str("\n> ");

    self.output.write_all(text.as_bytes())?;
    self.output.flush()?;
    Ok(())
  }

  fn invalid(&mut self) -> Result<()> {
    let text = self.paint(error(), "Invalid selection. Try again.");
    writeln!(self.output, "{text}")?;
    Ok(())
  }

  /// Read one answer, trimmed and lowercased
  fn answer(&mut self) -> Result<String> {
    let mut line = String::new();
    if self.input.read_line(&mut line)? == 0 {
      bail!("Input closed before a selection was made");
    }
    Ok(line.trim().to_lowercase())
  }

  /// Ask the user to pick one of the options, repeating until a valid index is entered
  pub fn select_one(&mut self, description: &str, options: &[String]) -> Result<String> {
    if options.is_empty() {
      bail!("No options to choose from");
    }

    loop {
      self.render(description, options, false, false)?;
      let answer = self.answer()?;
      if let Some(option) = answer.parse::<usize>().ok().and_then(|i| options.get(i)) {
        return Ok(option.to_owned());
      }
      self.invalid()?;
    }
  }

  /// Ask the user to pick one option from a paged source
  ///
  /// Pages are cached by index so going `back` replays them without fetching again.
  /// Returns `None` when the first page has no options.
  pub async fn select_one_paged<S: PageSource>(&mut self, description: &str, source: &mut S) -> Result<Option<String>> {
    let mut pages: Vec<Page> = Vec::new();
    match source.fetch(None).await? {
      Some(page) if !page.options.is_empty() => pages.push(page),
      _ => return Ok(None),
    }

    let mut index = 0;
    loop {
      let Some(page) = pages.get(index).cloned() else {
        bail!("Page {index} is missing from the cache");
      };
      let has_next = page.next_token.is_some();
      let has_back = index > 0;

      self.render(description, &page.options, has_next, has_back)?;
      let answer = self.answer()?;

      if let Some(option) = answer.parse::<usize>().ok().and_then(|i| page.options.get(i)) {
        return Ok(Some(option.to_owned()));
      }

      if answer == NEXT && has_next {
        if index + 1 < pages.len() {
          index += 1;
          continue;
        }

        debug!("Fetching page {}", index + 1);
        match source.fetch(page.next_token).await? {
          Some(next) if !next.options.is_empty() => {
            pages.push(next);
            index += 1;
          }
          _ => writeln!(self.output, "No more options")?,
        }
        continue;
      }

      if answer == BACK && has_back {
        index -= 1;
        continue;
      }

      self.invalid()?;
    }
  }
}
