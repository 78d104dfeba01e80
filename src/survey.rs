//! Guided meal-planning questions that compose the opening chat message.

pub const PEOPLE_OPTIONS: &[&str] = &["1 Person", "2 People", "3-4 People", "5+ People"];
pub const DAYS_OPTIONS: &[&str] = &["1-2 Days", "3-4 Days", "Full Week", "Custom"];

/// Answers to the planning questions. Skipped questions stay `None`/empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyAnswers {
    pub people: Option<String>,
    pub days: Option<String>,
    pub dietary: String,
}

impl SurveyAnswers {
    fn is_solo(&self) -> bool {
        self.people.as_deref() == Some("1 Person")
    }

    /// e.g. "We're shopping for 2 People for Full Week. Dietary requirements:
    /// Vegetarian. What should we cook?"
    pub fn opening_message(&self) -> String {
        let (subject, pronoun) = if self.is_solo() { ("I", "I'm") } else { ("we", "We're") };

        let mut parts = Vec::new();
        if let Some(people) = self.people.as_deref().filter(|p| !p.trim().is_empty()) {
            parts.push(format!("shopping for {}", people.trim()));
        }
        if let Some(days) = self.days.as_deref().filter(|d| !d.trim().is_empty()) {
            parts.push(format!("for {}", days.trim()));
        }

        let intro = if parts.is_empty() {
            format!("{} looking for some recipe ideas.", pronoun)
        } else {
            format!("{} {}.", pronoun, parts.join(" "))
        };
        let dietary = match self.dietary.trim() {
            "" => String::new(),
            d => format!(" Dietary requirements: {}.", d),
        };

        format!("{}{} What should {} cook?", intro, dietary, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_answers() {
        let answers = SurveyAnswers {
            people: Some("2 People".to_string()),
            days: Some("Full Week".to_string()),
            dietary: "Vegetarian".to_string(),
        };
        assert_eq!(
            answers.opening_message(),
            "We're shopping for 2 People for Full Week. Dietary requirements: Vegetarian. What should we cook?"
        );
    }

    #[test]
    fn test_single_person_uses_first_person() {
        let answers = SurveyAnswers {
            people: Some("1 Person".to_string()),
            ..Default::default()
        };
        assert_eq!(answers.opening_message(), "I'm shopping for 1 Person. What should I cook?");
    }

    #[test]
    fn test_everything_skipped() {
        assert_eq!(
            SurveyAnswers::default().opening_message(),
            "We're looking for some recipe ideas. What should we cook?"
        );
    }

    #[test]
    fn test_only_days_and_blank_dietary() {
        let answers = SurveyAnswers {
            people: None,
            days: Some("3-4 Days".to_string()),
            dietary: "   ".to_string(),
        };
        assert_eq!(answers.opening_message(), "We're for 3-4 Days. What should we cook?");
    }
}
