//! The regular expressions behind [`analyze`](super::analyze).

use regex::Regex;
use std::sync::LazyLock;

static TRIGGER_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:whenever|when|once|after|if)\s+[^,.;:!?\n]+")
        .expect("trigger clause regex")
});

static SCHEDULE_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:every\s+(?:\d+\s+)?(?:second|minute|hour|day|week|month|year|morning|evening|night|monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?|daily|hourly|weekly|monthly|nightly)\b",
    )
    .expect("schedule regex")
});

static ACTION_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(send|create|update|delete|remove|notify|add|fetch|get|sync|post|save|store|generate|email|alert|log|track)\s+(?:(?:a|an|the|all|new|every)\s+)?([a-z][a-z0-9-]*(?:\s+[a-z][a-z0-9-]*)?)",
    )
    .expect("action regex")
});

static FIELD_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:with|including|containing)\s+(?:the\s+)?(?:fields?|columns?|properties)|including|containing)\s*:?\s+([a-z0-9 _,'-]+)",
    )
    .expect("field list regex")
});

static LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\band\b|\bor\b").expect("list separator regex"));

/// Known services, reported in this order.
static INTEGRATIONS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("n8n", r"\bn8n\b"),
        ("airtable", r"\bairtable\b"),
        ("telegram", r"\btelegram\b"),
        ("slack", r"\bslack\b"),
        (
            "email",
            r"\b(?:gmail|smtp|send\s+(?:an?\s+)?e-?mails?|e-?mail\s+(?:the|to|notifications?)|(?:via|by)\s+e-?mail)\b",
        ),
        ("google sheets", r"\bgoogle\s+sheets?\b"),
        ("notion", r"\bnotion\b"),
        ("github", r"\bgithub\b"),
        ("discord", r"\bdiscord\b"),
        ("webhook", r"\bwebhooks?\b"),
        (
            "http api",
            r"\b(?:rest\s+api|http\s+requests?|api\s+calls?|external\s+api)\b",
        ),
    ]
    .into_iter()
    .map(|(label, pattern)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("integration regex");
        (label, re)
    })
    .collect()
});

/// Words that end an action's object phrase.
const STOP_WORDS: &[&str] = &[
    "to", "in", "into", "from", "on", "for", "with", "and", "or", "when", "then", "if", "via",
    "of", "it", "them", "this", "that", "every", "daily", "hourly", "weekly", "monthly", "at",
    "by", "as",
];

/// Longest phrase kept as a field name.
const MAX_FIELD_WORDS: usize = 3;

/// Trigger clauses and schedule phrases.
pub fn triggers(text: &str) -> Vec<String> {
    let clauses = TRIGGER_CLAUSE.find_iter(text).map(|m| {
        // Stop a clause at a "then" continuation.
        let clause = m.as_str();
        let lower = clause.to_lowercase();
        match lower.find(" then ") {
            Some(i) => lower[..i].to_string(),
            None => lower,
        }
    });
    let schedules = SCHEDULE_PHRASE.find_iter(text).map(|m| m.as_str().to_string());
    dedup(clauses.chain(schedules))
}

/// Verb phrases like `send report` or `notify sales team`.
pub fn actions(text: &str) -> Vec<String> {
    dedup(ACTION_PHRASE.captures_iter(text).map(|caps| {
        let verb = caps[1].to_lowercase();
        let object: Vec<String> = caps[2]
            .split_whitespace()
            .map(str::to_lowercase)
            .take_while(|w| !STOP_WORDS.contains(&w.as_str()))
            .collect();
        if object.is_empty() {
            verb
        } else {
            format!("{verb} {}", object.join(" "))
        }
    }))
}

/// Field names listed after "with fields", "including", "containing".
pub fn data_fields(text: &str) -> Vec<String> {
    dedup(FIELD_LIST.captures_iter(text).flat_map(|caps| {
        LIST_SEPARATOR
            .split(&caps[1])
            .map(|item| item.trim().trim_matches('\'').to_string())
            .filter(|item| {
                !item.is_empty() && item.split_whitespace().count() <= MAX_FIELD_WORDS
            })
            .collect::<Vec<_>>()
    }))
}

/// Known service names mentioned anywhere in the text.
pub fn integrations(text: &str) -> Vec<String> {
    INTEGRATIONS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(label, _)| label.to_string())
        .collect()
}

/// Lowercase, trim, drop empties and repeats while keeping first-seen order.
fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim().to_lowercase();
        if !item.is_empty() && !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_clause_stops_at_punctuation() {
        assert_eq!(
            triggers("Whenever a form is submitted, create a ticket"),
            vec!["whenever a form is submitted"]
        );
    }

    #[test]
    fn conditional_clause_is_a_trigger() {
        assert_eq!(
            triggers("If a payment fails, alert the finance team"),
            vec!["if a payment fails"]
        );
    }

    #[test]
    fn trigger_clause_stops_at_then() {
        assert_eq!(
            triggers("when an order ships then email the customer"),
            vec!["when an order ships"]
        );
    }

    #[test]
    fn schedule_phrases_are_triggers() {
        assert_eq!(
            triggers("Every 15 minutes check stock, and send a digest weekly"),
            vec!["every 15 minutes", "weekly"]
        );
    }

    #[test]
    fn action_without_object_is_bare_verb() {
        assert_eq!(actions("save it to airtable"), vec!["save"]);
    }

    #[test]
    fn action_drops_articles_and_trailing_stop_words() {
        assert_eq!(actions("Send the invoice to billing"), vec!["send invoice"]);
        assert_eq!(actions("create new contacts in hubspot"), vec!["create contacts"]);
    }

    #[test]
    fn actions_are_deduplicated() {
        assert_eq!(
            actions("Send report. Then send report."),
            vec!["send report"]
        );
    }

    #[test]
    fn verbs_inside_words_do_not_match() {
        assert!(actions("the address is posted").is_empty());
    }

    #[test]
    fn fields_split_on_commas_and_conjunctions() {
        assert_eq!(
            data_fields("Store orders with fields id, total or status."),
            vec!["id", "total", "status"]
        );
        assert_eq!(
            data_fields("a row containing first name and phone"),
            vec!["first name", "phone"]
        );
    }

    #[test]
    fn long_field_phrases_are_dropped() {
        assert_eq!(
            data_fields("including title and then forward everything to the team"),
            vec!["title"]
        );
    }

    #[test]
    fn integrations_in_fixed_order() {
        assert_eq!(
            integrations("Post to Slack when Airtable changes, via n8n"),
            vec!["n8n", "airtable", "slack"]
        );
    }

    #[test]
    fn email_integration_needs_sending_context() {
        assert!(integrations("rows with an email column").is_empty());
        assert_eq!(integrations("send an email to the owner"), vec!["email"]);
        assert_eq!(integrations("use Gmail"), vec!["email"]);
    }

    #[test]
    fn dedup_is_case_insensitive() {
        let items = ["Slack", "slack", " ", "Email"].into_iter().map(String::from);
        assert_eq!(dedup(items), vec!["slack", "email"]);
    }
}
