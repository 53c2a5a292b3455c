use chrono::{DateTime, Utc};
use serde::Serialize;

/// One chat exchange as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
    /// True when `bot` is the fallback message rather than model output
    pub fallback: bool,
    pub asked_at: DateTime<Utc>,
}

/// Append-only chat log owned by a single session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<Exchange>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, exchange: Exchange) -> &Exchange {
        self.entries.push(exchange);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[Exchange] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Exchange> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Exchange;
    type IntoIter = std::slice::Iter<'a, Exchange>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(user: &str) -> Exchange {
        Exchange {
            user: user.to_string(),
            bot: format!("re: {}", user),
            fallback: false,
            asked_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        for q in ["first", "second", "third"] {
            let appended = transcript.append(exchange(q));
            assert_eq!(appended.user, q);
        }

        let users: Vec<_> = transcript.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["first", "second", "third"]);
        assert_eq!(transcript.last().unwrap().user, "third");
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut transcript = Transcript::new();
        transcript.append(exchange("q"));

        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(value[0]["user"], "q");
        assert_eq!(value[0]["bot"], "re: q");
        assert_eq!(value[0]["fallback"], false);
    }
}
