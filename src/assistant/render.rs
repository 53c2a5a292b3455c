use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use std::fmt::Write as _;

use super::Transcript;
use crate::profile::DomainProfile;

/// HTML fragment for the chat sidebar. Empty transcripts render to nothing.
pub fn render_transcript(transcript: &Transcript, profile: &DomainProfile) -> String {
    if transcript.is_empty() {
        return String::new();
    }

    let mut html = String::from("<h3>Chat History:</h3>\n");
    let name = escape_html(profile.assistant_name);

    for exchange in transcript {
        let class = if exchange.fallback {
            "chat-history fallback"
        } else {
            "chat-history"
        };
        let _ = writeln!(
            html,
            "<div class=\"{}\"><strong>You:</strong> {}<br><strong>{}:</strong> {}</div>",
            class,
            escape_html(&exchange.user),
            name,
            escape_html(&exchange.bot),
        );
    }

    html
}

/// Plain-text rendering for the terminal chat.
pub fn render_transcript_text(transcript: &Transcript, profile: &DomainProfile) -> String {
    let mut out = String::new();
    for exchange in transcript {
        let _ = writeln!(out, "You: {}", exchange.user);
        let _ = writeln!(out, "{}: {}", profile.assistant_name, exchange.bot);
        out.push('\n');
    }
    out
}

/// Markdown model output as an HTML fragment.
///
/// Raw HTML in the source is rendered as text; links and images keep only their text.
pub fn render_markdown(markdown: &str) -> String {
    let events = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES)
        .filter(|event| {
            !matches!(
                event,
                Event::Start(Tag::Link { .. } | Tag::Image { .. })
                    | Event::End(TagEnd::Link | TagEnd::Image)
            )
        })
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::Exchange;
    use chrono::Utc;

    fn transcript(pairs: &[(&str, &str, bool)]) -> Transcript {
        let mut t = Transcript::new();
        for (user, bot, fallback) in pairs {
            t.append(Exchange {
                user: user.to_string(),
                bot: bot.to_string(),
                fallback: *fallback,
                asked_at: Utc::now(),
            });
        }
        t
    }

    #[test]
    fn test_empty_transcript_renders_nothing() {
        let profile = DomainProfile::medical();
        assert_eq!(render_transcript(&Transcript::new(), &profile), "");
        assert_eq!(render_transcript_text(&Transcript::new(), &profile), "");
    }

    #[test]
    fn test_renders_in_insertion_order_with_profile_name() {
        let profile = DomainProfile::medical();
        let html = render_transcript(
            &transcript(&[("one", "uno", false), ("two", "dos", true)]),
            &profile,
        );

        let first = html.find("one").unwrap();
        let second = html.find("two").unwrap();
        assert!(first < second);
        assert!(html.contains("<strong>Kairos:</strong> uno"));
        assert!(html.contains("chat-history fallback"));
        assert!(html.starts_with("<h3>Chat History:</h3>"));
    }

    #[test]
    fn test_user_and_model_text_are_escaped() {
        let profile = DomainProfile::veterinary();
        let html = render_transcript(
            &transcript(&[("<script>alert(1)</script>", "a & b", false)]),
            &profile,
        );

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<strong>Bot:</strong> a &amp; b"));
    }

    #[test]
    fn test_markdown_structure_is_rendered() {
        let html = render_markdown(
            "**Anatomical Region:** Chest\n\n- Opacity in the left lobe\n- No fracture\n",
        );
        assert!(html.contains("<strong>Anatomical Region:</strong> Chest"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>Opacity in the left lobe</li>"));
        assert!(!html.contains("**"));
    }

    #[test]
    fn test_markdown_drops_markup_and_links() {
        let html = render_markdown(
            "<script>alert(1)</script>\n\nSee [this](javascript:alert(1)) and <img src=x onerror=alert(1)>",
        );
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("href"));
        assert!(!html.contains("javascript:"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("See this and"));
    }

    #[test]
    fn test_text_rendering() {
        let profile = DomainProfile::veterinary();
        let text = render_transcript_text(&transcript(&[("hi", "hello", false)]), &profile);
        assert_eq!(text, "You: hi\nBot: hello\n\n");
    }
}
