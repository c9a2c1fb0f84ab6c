//! Keyword-matched canned responses used when no provider answers.
//!
//! Rules are checked in declaration order against the lower-cased message;
//! the first rule with a keyword contained in the message wins. A keyword
//! only counts where it starts a word, so the stem `injur` finds "injured"
//! while `ration` leaves "registration" alone. Keywords are lower-cased once
//! at construction.

use crate::config::FallbackRuleConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRule {
    keywords: Vec<String>,
    response: String,
}

impl FallbackRule {
    pub fn new<I, S>(keywords: I, response: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            response: response.into(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    /// `lowered` must already be lower-case.
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| starts_a_word(lowered, k))
    }
}

fn starts_a_word(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(at, _)| {
        haystack[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

impl From<&FallbackRuleConfig> for FallbackRule {
    fn from(c: &FallbackRuleConfig) -> Self {
        FallbackRule::new(&c.keywords, c.response.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FallbackTable {
    rules: Vec<FallbackRule>,
    default_response: String,
}

impl FallbackTable {
    pub fn new(rules: Vec<FallbackRule>, default_response: impl Into<String>) -> Self {
        Self { rules, default_response: default_response.into() }
    }

    /// The built-in disaster-relief table.
    pub fn builtin() -> Self {
        Self::new(builtin_rules(), DEFAULT_RESPONSE)
    }

    /// Built-in table with `custom` rules checked first.
    pub fn with_custom(custom: &[FallbackRuleConfig]) -> Self {
        let mut rules: Vec<FallbackRule> = custom.iter().map(FallbackRule::from).collect();
        rules.extend(builtin_rules());
        Self::new(rules, DEFAULT_RESPONSE)
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    pub fn default_response(&self) -> &str {
        &self.default_response
    }

    /// Response for `message`; never fails.
    pub fn lookup(&self, message: &str) -> &str {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(&lowered))
            .map(|r| r.response())
            .unwrap_or(self.default_response.as_str())
    }
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ── Built-in table ────────────────────────────────────────────────────────────

pub const DEFAULT_RESPONSE: &str = "I can't reach the AI service right now, but help is available. \
Emergency contacts: 112 (all emergencies), 108 (ambulance), 101 (fire), 100 (police), \
1078 (national disaster helpline), 1070 (state disaster control room). \
If you are in danger, move to a safe place and call 112 first.";

/// Life-safety rules come first so a message mentioning both an injury and
/// a shelter gets medical guidance.
fn builtin_rules() -> Vec<FallbackRule> {
    vec![
        FallbackRule::new(
            ["trapped", "stuck", "buried", "collapsed", "rescue", "drowning"],
            "If you or someone is trapped: call 112 immediately and share your exact location. \
             Stay where rescuers can reach you, tap on pipes or walls to signal, and avoid shouting \
             continuously to save energy. Keep your phone charged and switch to power-saving mode.",
        ),
        FallbackRule::new(
            ["bleeding", "injur", "unconscious", "medical", "ambulance", "hospital", "doctor", "medicine", "insulin", "wound"],
            "For medical emergencies call 108 for an ambulance. Apply firm pressure to bleeding wounds \
             with a clean cloth, keep injured people still and warm, and do not give food or water to \
             anyone unconscious. Carry prescriptions and essential medicines when you move.",
        ),
        FallbackRule::new(
            ["flood", "rising water", "water level", "inundat"],
            "Flood safety: move to higher ground now and do not walk or drive through moving water. \
             Switch off electricity at the mains if water is entering, keep documents in a waterproof \
             bag, and follow evacuation orders from local authorities. Disaster helpline: 1078.",
        ),
        FallbackRule::new(
            ["earthquake", "tremor", "aftershock"],
            "Earthquake safety: drop, cover and hold on under sturdy furniture until shaking stops. \
             Once outside, stay clear of buildings, walls and power lines. Expect aftershocks and do \
             not re-enter damaged buildings.",
        ),
        FallbackRule::new(
            ["cyclone", "storm", "thunderstorm", "hurricane", "typhoon"],
            "Cyclone safety: stay indoors away from windows, keep a battery radio for official updates, \
             and store drinking water and dry food for at least three days. Evacuate early if you live \
             in a low-lying or coastal area.",
        ),
        FallbackRule::new(
            ["fire", "wildfire", "smoke", "burn"],
            "Fire emergency: call 101. Leave the building immediately, stay low under smoke and never \
             use lifts. Cool burns with clean running water for 20 minutes.",
        ),
        FallbackRule::new(
            ["shelter", "relief camp", "evacuat", "homeless", "place to stay"],
            "Relief shelters are usually set up in government schools and community halls. Contact the \
             state disaster control room on 1070 or your district collector's office for the nearest \
             open shelter. Bring ID, medicines, water and a phone charger.",
        ),
        FallbackRule::new(
            ["food", "hungry", "drinking water", "ration", "thirst"],
            "Food and water: relief camps and registered NGOs distribute rations and drinking water. \
             Boil or purify water before drinking if supply is uncertain. Submit a Food request with \
             your location so volunteers can prioritise it.",
        ),
        FallbackRule::new(
            ["missing", "lost", "separated", "find my"],
            "For missing persons, report to the nearest police station (100) or relief camp desk with a \
             recent photo, description and last known location. Register the person in official \
             missing-persons lists as soon as possible.",
        ),
        FallbackRule::new(
            ["volunteer", "donate", "donation"],
            "To help: register with your district disaster management authority or a recognised NGO. \
             Donate through official relief funds, and prefer essentials (water, dry food, hygiene kits, \
             medicines) over used clothes.",
        ),
        FallbackRule::new(
            ["helpline", "contact", "phone number", "emergency number"],
            "Key helplines: 112 (all emergencies), 108 (ambulance), 101 (fire), 100 (police), \
             1078 (national disaster helpline), 1070 (state disaster control room).",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_rule_wins_when_both_match() {
        let table = FallbackTable::new(
            vec![FallbackRule::new(["shelter"], "S"), FallbackRule::new(["rajkot"], "R")],
            "D",
        );
        assert_eq!(table.lookup("Need shelter in Rajkot"), "S");
    }

    #[test]
    fn matching_is_case_insensitive_both_ways() {
        let table = FallbackTable::new(vec![FallbackRule::new(["Rajkot"], "R")], "D");
        assert_eq!(table.lookup("RAJKOT news"), "R");
        assert_eq!(table.rules()[0].keywords(), ["rajkot"]);
    }

    #[test]
    fn no_match_returns_default() {
        let table = FallbackTable::new(vec![FallbackRule::new(["shelter"], "S")], "D");
        assert_eq!(table.lookup("hello there"), "D");
        assert_eq!(table.lookup(""), "D");
    }

    #[test]
    fn blank_keywords_are_dropped() {
        let rule = FallbackRule::new(["", "  ", "flood"], "F");
        assert_eq!(rule.keywords(), ["flood"]);
        let table = FallbackTable::new(vec![FallbackRule::new([" "], "never")], "D");
        assert_eq!(table.lookup("anything"), "D");
    }

    #[test]
    fn builtin_prioritises_medical_over_shelter() {
        let table = FallbackTable::builtin();
        let reply = table.lookup("My father is bleeding, where is the nearest shelter?");
        assert!(reply.contains("108"));
    }

    #[test]
    fn builtin_flood_guidance() {
        let table = FallbackTable::builtin();
        let reply = table.lookup("flood help");
        assert!(reply.starts_with("Flood safety"));
    }

    #[test]
    fn keywords_match_at_word_starts_only() {
        let table = FallbackTable::new(vec![FallbackRule::new(["ration"], "F")], "D");
        assert_eq!(table.lookup("Rations for ward 5"), "F");
        assert_eq!(table.lookup("no ration cards left"), "F");
        assert_eq!(table.lookup("volunteer registration"), "D");
        assert_eq!(table.lookup("preparation, generation"), "D");
        assert_eq!(table.lookup("(ration) queue"), "F");
    }

    #[test]
    fn volunteer_registration_is_not_food() {
        let table = FallbackTable::builtin();
        assert!(table.lookup("volunteer registration").starts_with("To help"));
        assert!(table.lookup("my brother was injured").contains("108"));
    }

    #[test]
    fn custom_rules_precede_builtin() {
        let custom = vec![FallbackRuleConfig {
            keywords: vec!["Flood".into()],
            response: "Ward 5 boats at the bus stand".into(),
        }];
        let table = FallbackTable::with_custom(&custom);
        assert_eq!(table.lookup("flood in ward 5"), "Ward 5 boats at the bus stand");
        assert_eq!(table.rules().len(), FallbackTable::builtin().rules().len() + 1);
    }

    #[test]
    fn every_builtin_response_is_reachable() {
        let table = FallbackTable::builtin();
        for (i, rule) in table.rules().iter().enumerate() {
            let winner = table.lookup(&rule.keywords()[0]);
            let first_match = table
                .rules()
                .iter()
                .position(|r| r.response() == winner)
                .unwrap();
            assert_eq!(first_match, i, "rule {i} shadowed by an earlier rule");
        }
    }
}
