use chrono::{DateTime, Local, TimeZone};

/// Reply to a history request when nothing has been logged yet.
pub const NO_HISTORY: &str = "No chat history available.";

/// ANSI C calendar format, e.g. `Mon Jan  2 15:04:05 2006`.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A chat line as received by the server, before rendering.
#[derive(Debug, Clone)]
pub struct ChatLine<Tz: TimeZone = Local> {
    /// Trimmed line exactly as the client sent it (clients send `name: text`).
    pub text: String,
    pub received_at: DateTime<Tz>,
}

impl ChatLine<Local> {
    /// Stamp a line with the server's current local time.
    pub fn received_now(text: impl Into<String>) -> Self {
        Self::new(text, Local::now())
    }
}

impl<Tz: TimeZone> ChatLine<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    pub fn new(text: impl Into<String>, received_at: DateTime<Tz>) -> Self {
        Self {
            text: text.into(),
            received_at,
        }
    }

    /// Display name the client put in front of the message, if any.
    pub fn sender(&self) -> Option<&str> {
        self.text
            .split_once(": ")
            .map(|(name, _)| name)
            .filter(|name| !name.is_empty())
    }

    /// `[<timestamp>] <text>`, as fanned out to every client.
    pub fn render(&self) -> String {
        format!(
            "[{}] {}",
            self.received_at.format(TIMESTAMP_FORMAT),
            self.text
        )
    }
}

/// Number of connected users: N
pub fn user_count(count: usize) -> String {
    format!("Number of connected users: {}", count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_render_single_digit_day() {
        let line = ChatLine::new("Alice: hello", at(2006, 1, 2, 15, 4, 5));
        assert_eq!(line.render(), "[Mon Jan  2 15:04:05 2006] Alice: hello");
    }

    #[test]
    fn test_render_double_digit_day() {
        let line = ChatLine::new("Bob: hi", at(2024, 10, 19, 9, 30, 0));
        assert_eq!(line.render(), "[Sat Oct 19 09:30:00 2024] Bob: hi");
    }

    #[test]
    fn test_render_empty_text() {
        let line = ChatLine::new("", at(2006, 1, 2, 15, 4, 5));
        assert_eq!(line.render(), "[Mon Jan  2 15:04:05 2006] ");
    }

    #[test]
    fn test_sender() {
        let now = at(2006, 1, 2, 15, 4, 5);
        assert_eq!(ChatLine::new("Alice: hello", now).sender(), Some("Alice"));
        assert_eq!(
            ChatLine::new("Alice: re: lunch", now).sender(),
            Some("Alice")
        );
        assert_eq!(ChatLine::new("no name here", now).sender(), None);
        assert_eq!(ChatLine::new(": orphan", now).sender(), None);
    }

    #[test]
    fn test_received_now_renders_bracketed_timestamp() {
        let rendered = ChatLine::received_now("Alice: hello").render();
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with("] Alice: hello"));
    }

    #[test]
    fn test_user_count() {
        assert_eq!(user_count(0), "Number of connected users: 0");
        assert_eq!(user_count(2), "Number of connected users: 2");
    }
}
