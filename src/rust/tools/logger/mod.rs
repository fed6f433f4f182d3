#[cfg(feature = "cli")]
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
#[cfg(feature = "cli")]
use std::fmt::Write;

pub mod structured_error;

pub use structured_error::StructuredError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Success,
    Error,
    Info,
    Warning,
    Watch,
    Debug,
    Action,
}

/// Console logger shared across the CLI, the services and the playback core.
///
/// Debug lines (one per transmitted LED command, one per note) are only
/// printed in verbose mode. Colors are used when stdout is a terminal.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    verbose: bool,
    quiet: bool,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// A logger that prints nothing, used by tests and embedders.
    pub fn silent() -> Self {
        Self {
            verbose: false,
            quiet: true,
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        !self.quiet && (level != LogLevel::Debug || self.verbose)
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        if self.enabled(level) {
            self.print_line(level, message.as_ref());
        }
    }

    pub fn log_with_details<I, S>(&self, level: LogLevel, message: impl AsRef<str>, details: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.enabled(level) {
            return;
        }
        self.print_line(level, message.as_ref());
        for detail in details {
            self.print_detail(detail.as_ref());
        }
    }

    /// Log a structured error with path, code, causes and suggestion lines
    pub fn log_structured_error(&self, error: &StructuredError) {
        if !self.enabled(LogLevel::Error) {
            return;
        }
        self.print_line(LogLevel::Error, &error.message);
        for (label, content) in error.build_details() {
            self.print_labeled_detail(&label, &content);
        }
    }

    pub fn success(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Success, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    pub fn watch(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Watch, message);
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn action(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Action, message);
    }

    fn print_detail(&self, detail: &str) {
        if self.colored() {
            println!("   ↳ {}", detail);
        } else {
            println!("   -> {}", detail);
        }
    }

    fn print_labeled_detail(&self, label: &str, content: &str) {
        #[cfg(feature = "cli")]
        {
            if self.colored() {
                let mut output = String::from("   ↳ ");
                let _ = write!(
                    &mut output,
                    "{}{}{}{}: {}{}{}",
                    SetForegroundColor(Color::Rgb {
                        r: 110,
                        g: 110,
                        b: 110
                    }),
                    SetAttribute(Attribute::Bold),
                    label,
                    SetAttribute(Attribute::Reset),
                    SetForegroundColor(Color::White),
                    content,
                    ResetColor
                );
                println!("{}", output);
                return;
            }
        }
        println!("   -> {}: {}", label, content);
    }

    fn print_line(&self, level: LogLevel, message: &str) {
        #[cfg(feature = "cli")]
        {
            if self.colored() {
                println!("{}", self.render_colored_line(level, message));
                return;
            }
        }
        println!("[{}] {}", level.as_label(), message);
    }

    #[cfg(feature = "cli")]
    fn colored(&self) -> bool {
        atty::is(atty::Stream::Stdout)
    }

    #[cfg(not(feature = "cli"))]
    fn colored(&self) -> bool {
        false
    }

    #[cfg(feature = "cli")]
    fn render_colored_line(&self, level: LogLevel, message: &str) -> String {
        let mut out = String::new();
        let (emoji, color) = level.visuals();

        out.push_str(emoji);
        out.push(' ');
        out.push_str(&self.render_signature());
        out.push(' ');
        out.push_str(&self.render_status(level, color));
        out.push(' ');
        out.push_str(message);
        out
    }

    #[cfg(feature = "cli")]
    fn render_signature(&self) -> String {
        let mut s = String::new();
        let _ = write!(&mut s, "{}", SetForegroundColor(Color::Grey));
        s.push('[');
        let _ = write!(
            &mut s,
            "{}{}",
            SetForegroundColor(Color::Rgb {
                r: 255,
                g: 193,
                b: 7,
            }),
            SetAttribute(Attribute::Bold)
        );
        s.push_str("Keylight");
        let _ = write!(
            &mut s,
            "{}{}",
            SetAttribute(Attribute::Reset),
            SetForegroundColor(Color::Grey)
        );
        s.push(']');
        let _ = write!(&mut s, "{}", ResetColor);
        s
    }

    #[cfg(feature = "cli")]
    fn render_status(&self, level: LogLevel, color: Color) -> String {
        let mut s = String::new();
        let _ = write!(
            &mut s,
            "{}{}",
            SetForegroundColor(color),
            SetAttribute(Attribute::Bold)
        );
        s.push('[');
        s.push_str(level.as_label());
        s.push(']');
        let _ = write!(&mut s, "{}{}", SetAttribute(Attribute::Reset), ResetColor);
        s
    }
}

impl LogLevel {
    fn as_label(self) -> &'static str {
        match self {
            LogLevel::Success => "SUCCESS",
            LogLevel::Error => "ERROR",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Watch => "WATCH",
            LogLevel::Debug => "DEBUG",
            LogLevel::Action => "ACTION",
        }
    }

    #[cfg(feature = "cli")]
    fn visuals(self) -> (&'static str, Color) {
        match self {
            LogLevel::Success => ("✅", Color::Rgb { r: 76, g: 175, b: 80 }),
            LogLevel::Error => ("❌", Color::Rgb { r: 244, g: 67, b: 54 }),
            LogLevel::Info => ("ℹ️ ", Color::Rgb { r: 33, g: 150, b: 243 }),
            LogLevel::Warning => ("⚠️", Color::Rgb { r: 255, g: 152, b: 0 }),
            LogLevel::Watch => ("👀", Color::Rgb { r: 171, g: 71, b: 188 }),
            LogLevel::Debug => ("🛠️", Color::Rgb { r: 121, g: 134, b: 203 }),
            LogLevel::Action => ("💡", Color::Rgb { r: 0, g: 188, b: 212 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_requires_verbose() {
        let logger = Logger::new();
        assert!(logger.enabled(LogLevel::Info));
        assert!(!logger.enabled(LogLevel::Debug));

        let logger = Logger::new().verbose(true);
        assert!(logger.enabled(LogLevel::Debug));
    }

    #[test]
    fn test_silent_logger_disables_everything() {
        let logger = Logger::silent();
        assert!(!logger.enabled(LogLevel::Error));
        assert!(!logger.enabled(LogLevel::Success));
    }
}
