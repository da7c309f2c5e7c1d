//! Colored terminal output for the CLI.

use owo_colors::OwoColorize;

pub struct Output {
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// One-line startup banner with the listen address.
    pub fn banner(&self, address: &str) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n  {} {}  {}\n",
                "study-rag-server".bright_cyan().bold(),
                version.dimmed(),
                format!("http://{}", address).bright_white()
            );
        } else {
            println!("\n  study-rag-server {}  http://{}\n", version, address);
        }
    }

    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Warnings go to stderr so piped answers stay clean.
    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    /// Errors go to stderr.
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print an answer unadorned so it can be piped.
    pub fn answer(&self, text: &str) {
        println!("{}", text);
    }

    /// Print the fragments an answer was grounded on, to stderr.
    pub fn sources(&self, fragments: &[&str]) {
        if fragments.is_empty() {
            self.warning("No context was retrieved");
            return;
        }
        for (i, fragment) in fragments.iter().enumerate() {
            let preview = preview(fragment, 80);
            if self.colored {
                eprintln!("  {} {}", format!("[{}]", i + 1).dimmed(), preview.dimmed());
            } else {
                eprintln!("  [{}] {}", i + 1, preview);
            }
        }
    }
}

/// First `max_chars` characters on one line.
fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &flat[..idx]),
        None => flat,
    }
}
